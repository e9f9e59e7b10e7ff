//! Configuration table template and system initialization

use serde_json::{json, Value};
use tracing::info;

use super::{TableSettings, DASHBOARD_URL, ID_CHECK_SENTINEL};
use crate::error::{IdentityError, Result};
use crate::sheets::{Row, Tab, Workbook};

const AUTO_FILL: &str = "(This field auto-fills during initialization)";

/// 0-based position of the Dashboard URL value cell (B3).
const DASHBOARD_URL_CELL: (usize, usize) = (2, 1);

fn row(key: &str, value: &str, description: &str) -> Row {
    vec![json!(key), json!(value), json!(description)]
}

/// The default configuration table, header row first.
pub fn config_template() -> Vec<Row> {
    vec![
        row("Setting Name", "Value (Paste URL or Name Here)", "Description"),
        row("SPREADSHEET URLs", "", "Paste the full URL from your browser's address bar."),
        row(DASHBOARD_URL, AUTO_FILL, "The URL of this main dashboard spreadsheet."),
        row("Attendance Tracker URL", "", "Paste the URL of the \"Attendance Tracker\" sheet."),
        row("Event Management URL", "", "Paste the URL of the \"Event Management\" sheet."),
        row("Donation Data URL", "", "Paste the URL of the \"Donation Data\" sheet."),
        row("Central Response URL", "", "Paste the URL of the \"Central Response\" sheet."),
        row("Tools URL", "", "Paste the URL of the \"Tools\" sheet."),
        row("", "", ""),
        row("CRITICAL TAB NAMES", "", "Only change these if you rename the tabs in your sheets."),
        row("Master Directory Tab", "Directory", "The name of the tab containing the main member list."),
        row("New Member Form Tab", "New Member Form", "The tab that receives new member form responses."),
        row("Event Check-in Tab", "Check-in Management", "The tab in Event Mgt that lists newly created forms."),
        row("Event Attendance Tab", "Event Attendance", "The tab in Central Response that logs event attendees."),
        row("", "", ""),
        row(ID_CHECK_SENTINEL, "", "List of all tabs to scan for duplicate names & max ID."),
        row("Dashboard", "Directory", ""),
        row("Attendance Tracker", "Service Attendance", ""),
        row("Attendance Tracker", "Event Attendance", ""),
        row("Central Response", "Event Attendance", ""),
    ]
}

/// Insert the template as the first tab. Refuses to overwrite an existing one.
pub fn create_config_tab(workbook: &mut Workbook, tab_name: &str) -> Result<()> {
    if workbook.tab(tab_name).is_some() {
        return Err(IdentityError::config(format!(
            "the \"{tab_name}\" sheet already exists. No changes were made."
        )));
    }
    workbook.insert_front(Tab::new(tab_name, config_template()));
    info!("🎨 Created \"{}\" sheet. Fill in the URLs in column B, then initialize.", tab_name);
    Ok(())
}

/// Record the workbook's own URL and report how many settings are in effect.
pub fn initialize_system(workbook: &mut Workbook, tab_name: &str) -> Result<usize> {
    let own_url = workbook.url.clone();
    let tab = workbook.tab_mut(tab_name).ok_or_else(|| {
        IdentityError::config(format!(
            "a sheet named \"{tab_name}\" was not found. Create the config sheet first."
        ))
    })?;

    let (row, col) = DASHBOARD_URL_CELL;
    tab.set_cell(row, col, Value::String(own_url.clone()));

    let count = TableSettings::from_rows(&tab.rows, &own_url).len();
    info!("🚀 Setup complete. {} settings in effect.", count);
    Ok(count)
}
