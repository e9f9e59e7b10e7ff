//! New member intake
//!
//! A form response lands as one row of the new member form tab. Intake
//! names the row, gives it a Person ID and, unless the person is already
//! listed, copies them into the first free row of the master directory.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::resolution::{form, log_fatal, require_global_scheme, require_tab, IdentityService, SingleRowReport};
use crate::error::{IdentityError, Result};
use crate::identity::NormalizedKey;
use crate::sheets::{row_text, CellWrite, DeltaWriter, WorkbookWriter};

/// Master directory columns
mod directory {
    pub const WIDTH: usize = 22;
    pub const ID: usize = 0;
    pub const FULL_NAME: usize = 1;
    pub const LAST_NAME: usize = 2;
    pub const FIRST_NAME: usize = 3;
    pub const STREET: usize = 4;
    pub const CITY: usize = 5;
    pub const STATE: usize = 6;
    pub const ZIP: usize = 7;
    pub const PHONE: usize = 9;
    pub const EMAIL: usize = 10;
    pub const NOTES: usize = 13;
    pub const STATUS: usize = 14;
    pub const JOINED: usize = 21;
}

const JOINED_FORMAT: &str = "%m/%d/%Y";

/// Answers submitted with the new member form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormAnswers {
    pub last_name: String,
    pub first_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub phone: String,
    pub email: String,
    pub notes: String,
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSubmission {
    /// 1-based row of the form tab holding this response
    pub row: usize,
    pub answers: FormAnswers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntakeOutcome {
    MissingNames,
    AlreadyListed { directory_row: usize },
    Copied { directory_row: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeReport {
    pub form_row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment: Option<SingleRowReport>,
    pub outcome: IntakeOutcome,
}

impl IdentityService {
    pub async fn process_submission(&self, submission: &FormSubmission) -> Result<IntakeReport> {
        log_fatal("New member intake", self.run_intake(submission).await)
    }

    async fn run_intake(&self, submission: &FormSubmission) -> Result<IntakeReport> {
        let mut session = self.open().await?;
        require_global_scheme(&session.config, "New member intake")?;
        let form_tab = session.config.require_form_tab()?.to_string();
        let directory_tab = session.config.require_directory_tab()?.to_string();
        require_tab(&session.workbook, &directory_tab)?;

        let row = submission.row;
        if row <= require_tab(&session.workbook, &form_tab)?.header_rows() {
            return Err(IdentityError::DataShape {
                row,
                reason: format!("not a data row of \"{form_tab}\""),
            });
        }
        let row_index = row - 1;
        let answers = &submission.answers;

        let (first, last) = (answers.first_name.trim(), answers.last_name.trim());
        if first.is_empty() || last.is_empty() {
            warn!("⚠️ Row {}: first or last name missing. Intake stopped.", row);
            return Ok(IntakeReport {
                form_row: row,
                full_name: None,
                assignment: None,
                outcome: IntakeOutcome::MissingNames,
            });
        }

        let full_name = format!("{first} {last}");
        let form_sheet = require_tab(&session.workbook, &form_tab)?;
        let mut writes = vec![CellWrite::new(row_index, form::FULL_NAME, full_name.as_str())];
        if form_sheet.cell(row_index, form::LAST_NAME).trim().is_empty() {
            writes.push(CellWrite::new(row_index, form::LAST_NAME, last));
        }
        if form_sheet.cell(row_index, form::FIRST_NAME).trim().is_empty() {
            writes.push(CellWrite::new(row_index, form::FIRST_NAME, first));
        }
        WorkbookWriter::new(&mut session.workbook, self.store())
            .write_batch(&form_tab, &writes)
            .await?;
        info!("📝 Row {}: combined name '{}'.", row, full_name);

        let assignment = self.assign_row_in(&mut session, row).await?;

        let form_sheet = require_tab(&session.workbook, &form_tab)?;
        let id = form_sheet.cell(row_index, form::ID).trim().to_string();
        let last = cell_or(form_sheet.cell(row_index, form::LAST_NAME), last);
        let first = cell_or(form_sheet.cell(row_index, form::FIRST_NAME), first);

        let listing = require_tab(&session.workbook, &directory_tab)?;
        let wanted = NormalizedKey::from_parts(&first, &last);
        // Listed by name, or already holding the ID this row just resolved to.
        let existing = listing.rows.iter().enumerate().skip(1).find(|(_, cells)| {
            (!id.is_empty() && row_text(cells, directory::ID).trim() == id)
                || NormalizedKey::from_parts(
                    &row_text(cells, directory::FIRST_NAME),
                    &row_text(cells, directory::LAST_NAME),
                ) == wanted
        });
        if let Some((existing, _)) = existing {
            info!(
                "👥 {} is already in \"{}\" (row {}). Nothing copied.",
                full_name,
                directory_tab,
                existing + 1
            );
            return Ok(IntakeReport {
                form_row: row,
                full_name: Some(full_name),
                assignment: Some(assignment),
                outcome: IntakeOutcome::AlreadyListed {
                    directory_row: existing + 1,
                },
            });
        }

        let target = (1..=listing.rows.len().max(1))
            .find(|&r| listing.cell(r, directory::LAST_NAME).trim().is_empty())
            .unwrap_or(listing.rows.len());

        let mut values = vec![String::new(); directory::WIDTH];
        values[directory::ID] = id;
        values[directory::FULL_NAME] = full_name.clone();
        values[directory::LAST_NAME] = last;
        values[directory::FIRST_NAME] = first;
        values[directory::STREET] = answers.street.trim().to_string();
        values[directory::CITY] = answers.city.trim().to_string();
        values[directory::STATE] = answers.state.trim().to_uppercase();
        values[directory::ZIP] = answers.zip.trim().to_string();
        values[directory::PHONE] = answers.phone.trim().to_string();
        values[directory::EMAIL] = answers.email.trim().to_string();
        values[directory::NOTES] = answers.notes.trim().to_string();
        values[directory::STATUS] = answers.status.trim().to_string();
        values[directory::JOINED] = format_joined(&answers.timestamp);

        let writes: Vec<CellWrite> = values
            .into_iter()
            .enumerate()
            .map(|(column, value)| CellWrite::new(target, column, value))
            .collect();
        WorkbookWriter::new(&mut session.workbook, self.store())
            .write_batch(&directory_tab, &writes)
            .await?;
        info!("📋 Copied {} to \"{}\" row {}.", full_name, directory_tab, target + 1);

        Ok(IntakeReport {
            form_row: row,
            full_name: Some(full_name),
            assignment: Some(assignment),
            outcome: IntakeOutcome::Copied {
                directory_row: target + 1,
            },
        })
    }
}

fn cell_or(cell: String, fallback: &str) -> String {
    let cell = cell.trim();
    if cell.is_empty() {
        fallback.to_string()
    } else {
        cell.to_string()
    }
}

/// Render a form timestamp as `MM/dd/yyyy`. Unrecognised input is kept as is.
fn format_joined(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return stamp.format(JOINED_FORMAT).to_string();
    }
    for pattern in ["%m/%d/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(raw, pattern) {
            return stamp.format(JOINED_FORMAT).to_string();
        }
    }
    for pattern in ["%m/%d/%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, pattern) {
            return date.format(JOINED_FORMAT).to_string();
        }
    }
    raw.to_string()
}
