//! Identity Service
//!
//! Every entry point is one self-contained invocation: open the active
//! workbook, read its configuration, rebuild the master index from all
//! configured locations, apply it, and persist the changed cells once.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::template::{create_config_tab, initialize_system};
use crate::config::{
    IdSchemeKind, RuntimeConfig, SettingsProvider, SourceLocation, SourceLocationRegistry, SystemConfig,
    TableSettings,
};
use crate::error::{IdentityError, Result};
use crate::identity::{
    CanonicalId, CommunityAssigner, DirectorySynchronizer, IdAllocator, IdScheme, IdentityIndexBuilder, KeyPolicy,
    MasterIndex, NormalizedKey, RowOutcome, ScanReport, SequenceStore, SqliteSequence,
};
use crate::sheets::{row_text, CellWrite, DeltaWriter, Workbook, WorkbookSource, WorkbookStore, WorkbookWriter};

/// New member form columns
pub(crate) mod form {
    pub const ID: usize = 0;
    pub const FULL_NAME: usize = 1;
    pub const LAST_NAME: usize = 2;
    pub const FIRST_NAME: usize = 3;
}

/// Source key under which the active workbook scans itself.
pub(crate) const SELF_SOURCE_KEY: &str = "Dashboard";

/// The active workbook and the configuration read from it
pub(crate) struct Session {
    pub(crate) workbook: Workbook,
    pub(crate) settings: Arc<TableSettings>,
    pub(crate) config: SystemConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub target_tab: String,
    pub scan: ScanReport,
    pub rows_examined: usize,
    pub ids_written: usize,
    pub new_ids: usize,
    pub highest_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SingleRowOutcome {
    /// The row has no name; nothing was scanned or written.
    SkippedBlankName,
    Resolved {
        id: CanonicalId,
        newly_allocated: bool,
        written: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SingleRowReport {
    pub tab: String,
    /// 1-based sheet row
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanReport>,
    pub outcome: SingleRowOutcome,
}

pub struct IdentityService {
    runtime: RuntimeConfig,
    store: WorkbookStore,
}

impl IdentityService {
    pub fn new(runtime: RuntimeConfig) -> Self {
        let store = WorkbookStore::new(runtime.workbook.clone());
        Self { runtime, store }
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    pub(crate) fn store(&self) -> &WorkbookStore {
        &self.store
    }

    /// Rebuild the index and rewrite every stale directory ID.
    ///
    /// Under the community scheme this fills blank community IDs instead.
    pub async fn full_rescan(&self) -> Result<ResolutionReport> {
        log_fatal("Full rescan", self.run_full_rescan().await)
    }

    /// Resolve or allocate the ID of one new member form row (1-based).
    pub async fn assign_single_row(&self, row: usize) -> Result<SingleRowReport> {
        log_fatal("Single-row assignment", self.run_single_row(row).await)
    }

    pub async fn assign_community_ids(&self) -> Result<ResolutionReport> {
        log_fatal("Community ID assignment", self.run_community().await)
    }

    /// Insert the default configuration tab into the active workbook.
    pub async fn create_config(&self) -> Result<()> {
        log_fatal("Config creation", self.run_create_config().await)
    }

    /// Record the active workbook's URL in its configuration tab.
    pub async fn initialize(&self) -> Result<usize> {
        log_fatal("Initialization", self.run_initialize().await)
    }

    pub(crate) async fn open(&self) -> Result<Session> {
        let workbook = self.store.load().await?;
        let (config, settings) = SystemConfig::load(&workbook, &self.runtime.config_tab, &self.runtime.sentinel)?;
        Ok(Session {
            workbook,
            settings: Arc::new(settings),
            config,
        })
    }

    async fn build_index(&self, session: &Session, registry: &SourceLocationRegistry) -> (MasterIndex, ScanReport) {
        let settings: Arc<dyn SettingsProvider> = session.settings.clone();
        let source = WorkbookSource::new(
            Arc::new(session.workbook.clone()),
            settings,
            self.runtime.workbook_catalog(),
        );
        IdentityIndexBuilder::new(&source, session.config.key_policy, session.config.global_scheme())
            .build(registry)
            .await
    }

    fn sequence(&self) -> Result<Option<Box<dyn SequenceStore>>> {
        match &self.runtime.sequence_db {
            Some(path) => {
                debug!("Drawing new IDs from sequence store {:?}", path);
                Ok(Some(Box::new(SqliteSequence::open(path)?)))
            }
            None => Ok(None),
        }
    }

    fn allocator(&self, index: MasterIndex, scheme: IdScheme) -> Result<IdAllocator> {
        let allocator = IdAllocator::new(index, scheme);
        Ok(match self.sequence()? {
            Some(sequence) => allocator.with_sequence(sequence),
            None => allocator,
        })
    }

    async fn run_full_rescan(&self) -> Result<ResolutionReport> {
        let mut session = self.open().await?;
        if session.config.scheme == IdSchemeKind::Community {
            info!("Community scheme configured. Filling blank community IDs.");
            return self.community_in(&mut session).await;
        }

        let directory_tab = session.config.require_directory_tab()?.to_string();
        let tab = require_tab(&session.workbook, &directory_tab)?;
        info!("🔄 Starting full Person ID rescan of \"{}\"...", directory_tab);

        let registry = scan_registry(&session, &directory_tab);
        let (index, scan) = self.build_index(&session, &registry).await;
        let mut allocator = self.allocator(index, session.config.global_scheme())?;
        let sync = DirectorySynchronizer::new(session.config.key_policy);
        let plan = sync.plan(&mut allocator, &tab.rows, tab.header_rows())?;

        let mut writer = WorkbookWriter::new(&mut session.workbook, &self.store);
        let written = sync.apply(&plan, &directory_tab, &mut writer).await?;

        Ok(ResolutionReport {
            target_tab: directory_tab,
            scan,
            rows_examined: plan.rows_examined,
            ids_written: written,
            new_ids: plan.new_ids,
            highest_id: allocator.index().max_numeric_seen(),
        })
    }

    async fn run_single_row(&self, row: usize) -> Result<SingleRowReport> {
        let mut session = self.open().await?;
        self.assign_row_in(&mut session, row).await
    }

    pub(crate) async fn assign_row_in(&self, session: &mut Session, row: usize) -> Result<SingleRowReport> {
        require_global_scheme(&session.config, "Single-row assignment")?;
        let form_tab = session.config.require_form_tab()?.to_string();
        let tab = require_tab(&session.workbook, &form_tab)?;
        if row <= tab.header_rows() {
            return Err(IdentityError::DataShape {
                row,
                reason: format!("not a data row of \"{form_tab}\""),
            });
        }

        let row_index = row - 1;
        let cells = tab.rows.get(row_index).cloned().unwrap_or_default();
        let policy = session.config.key_policy;
        let key = form_key(policy, &cells);
        if key.is_empty() {
            info!("Row {} of \"{}\" has no name. Skipping ID assignment.", row, form_tab);
            return Ok(SingleRowReport {
                tab: form_tab,
                row,
                scan: None,
                outcome: SingleRowOutcome::SkippedBlankName,
            });
        }

        let previous = row_text(&cells, form::ID).trim().to_string();
        let scheme = session.config.global_scheme();
        let (mut index, mut scan) = self.build_index(session, &session.config.sources).await;

        // The form tab is keyed by its own name columns, after every configured source.
        if !covers_target(session, &form_tab) {
            for cells in tab.rows.iter().skip(tab.header_rows()) {
                scan.rows_scanned += 1;
                let outcome = index.absorb_keyed(&row_text(cells, form::ID), form_key(policy, cells), &scheme);
                if outcome == RowOutcome::Malformed {
                    scan.malformed_rows += 1;
                }
            }
            scan.locations_scanned += 1;
            scan.unique_names = index.len();
            scan.highest_id = index.max_numeric_seen();
        }

        let mut allocator = self.allocator(index, scheme)?;
        let (id, newly_allocated) = allocator.resolve_or_allocate(&key)?;

        let written = if id.as_str() != previous {
            let mut writer = WorkbookWriter::new(&mut session.workbook, &self.store);
            writer
                .write_batch(&form_tab, &[CellWrite::new(row_index, form::ID, id.as_str())])
                .await?
                > 0
        } else {
            false
        };

        if newly_allocated {
            info!("🆕 Assigned new ID {} to '{}' on row {}.", id, key, row);
        } else {
            info!("🔗 Matched '{}' on row {} to existing ID {}.", key, row, id);
        }

        Ok(SingleRowReport {
            tab: form_tab,
            row,
            scan: Some(scan),
            outcome: SingleRowOutcome::Resolved {
                id,
                newly_allocated,
                written,
            },
        })
    }

    async fn run_community(&self) -> Result<ResolutionReport> {
        let mut session = self.open().await?;
        self.community_in(&mut session).await
    }

    async fn community_in(&self, session: &mut Session) -> Result<ResolutionReport> {
        let options = session.config.community.clone();
        let directory_tab = session.config.require_directory_tab()?.to_string();

        let profile = require_tab(&session.workbook, &options.profile_tab)?;
        let (code_row, code_col) = options.code_cell;
        let code = profile.cell(code_row, code_col).trim().to_uppercase();
        if code.is_empty() {
            return Err(IdentityError::config(format!(
                "community code not found in \"{}\"",
                options.profile_tab
            )));
        }
        let assigner = CommunityAssigner::new(&code, session.config.id_width)?;

        let tab = require_tab(&session.workbook, &directory_tab)?;
        let id_column = CommunityAssigner::locate_id_column(&tab.rows, options.header_row, &options.id_header)?;
        let plan = assigner.plan(&tab.rows, options.header_row, id_column, self.sequence()?)?;

        let scheme = assigner.scheme();
        let highest_id = tab
            .rows
            .iter()
            .skip(options.header_row + 1)
            .map(|cells| row_text(cells, id_column))
            .chain(plan.changes.iter().map(|change| change.id.to_string()))
            .filter_map(|raw| scheme.parse_numeric(&raw))
            .max()
            .unwrap_or(0);

        let mut writer = WorkbookWriter::new(&mut session.workbook, &self.store);
        let written = writer.write_batch(&directory_tab, &plan.writes(id_column)).await?;
        if written == 0 {
            info!("✅ No blank Person IDs in \"{}\".", directory_tab);
        } else {
            info!("✅ Assigned {} new {} IDs.", written, code);
        }

        Ok(ResolutionReport {
            target_tab: directory_tab,
            scan: ScanReport::default(),
            rows_examined: plan.rows_examined,
            ids_written: written,
            new_ids: plan.new_ids,
            highest_id,
        })
    }

    async fn run_create_config(&self) -> Result<()> {
        let mut workbook = self.store.load().await?;
        create_config_tab(&mut workbook, &self.runtime.config_tab)?;
        self.store.save(&workbook).await
    }

    async fn run_initialize(&self) -> Result<usize> {
        let mut workbook = self.store.load().await?;
        let count = initialize_system(&mut workbook, &self.runtime.config_tab)?;
        self.store.save(&workbook).await?;
        Ok(count)
    }
}

/// Configured locations, plus the target tab itself when no location covers it.
///
/// The target is scanned last so it never outranks a configured source.
pub(crate) fn scan_registry(session: &Session, target_tab: &str) -> SourceLocationRegistry {
    let mut registry = session.config.sources.clone();
    if !covers_target(session, target_tab) {
        debug!("\"{}\" is not a configured location; scanning it last.", target_tab);
        registry.push_if_absent(SourceLocation::new(SELF_SOURCE_KEY, target_tab));
    }
    registry
}

/// Whether a configured location already reads `target_tab` of the active workbook.
fn covers_target(session: &Session, target_tab: &str) -> bool {
    let own_url = session.workbook.url.trim();
    session.config.sources.locations().iter().any(|location| {
        location.tab_name == target_tab
            && session
                .settings
                .get(&location.url_setting())
                .is_some_and(|url| url.trim() == own_url)
    })
}

/// Key for a new member form row. The form keeps first and last names in
/// their own columns, so the first/last policy reads those instead.
pub(crate) fn form_key(policy: KeyPolicy, cells: &[Value]) -> NormalizedKey {
    match policy {
        KeyPolicy::FullName => NormalizedKey::from_name(&row_text(cells, form::FULL_NAME)),
        KeyPolicy::FirstLast => {
            NormalizedKey::from_parts(&row_text(cells, form::FIRST_NAME), &row_text(cells, form::LAST_NAME))
        }
    }
}

/// Form rows are numbered globally; a community deployment numbers its
/// directory with `community` instead.
pub(crate) fn require_global_scheme(config: &SystemConfig, operation: &str) -> Result<()> {
    match config.scheme {
        IdSchemeKind::Global => Ok(()),
        IdSchemeKind::Community => Err(IdentityError::config(format!(
            "{operation} is not available under the community ID scheme. Run the community assignment instead."
        ))),
    }
}

pub(crate) fn require_tab<'w>(workbook: &'w Workbook, name: &str) -> Result<&'w crate::sheets::Tab> {
    workbook
        .tab(name)
        .ok_or_else(|| IdentityError::config(format!("sheet \"{name}\" not found")))
}

/// Log an operation-level failure once, then hand it back.
pub(crate) fn log_fatal<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        error!("❌ {} aborted: {}", operation, e);
    }
    result
}
