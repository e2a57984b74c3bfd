//! Backup orchestrator - drives one dump from discovery to footer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;
use tracing::{debug, info};

use crate::config::{Config, Section};
use crate::core::traits::{ObjectKind, RoutineKind, SchemaSource};
use crate::drivers::MysqlSource;
use crate::dump::catalog;
use crate::dump::data::{dump_table, time_zone_prologue, TIME_ZONE_EPILOGUE};
use crate::dump::format::{banner, footer, header};
use crate::dump::schema::{self, DeferredForeignKeys};
use crate::dump::sink::{backup_file_path, create_file, OutputSink};
use crate::error::Result;

const FOREIGN_KEY_CHECKS_OFF: &str = "SET FOREIGN_KEY_CHECKS = FALSE;\n\n";
const FOREIGN_KEY_CHECKS_ON: &str = "SET FOREIGN_KEY_CHECKS = TRUE;\n\n";

/// Backup orchestrator.
pub struct BackupRunner {
    config: Config,
    source: Arc<dyn SchemaSource>,
}

/// Result of a backup run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupSummary {
    /// Database that was dumped.
    pub database: String,

    /// Dump file, when writing to a file.
    pub output_path: Option<PathBuf>,

    /// When the run started (local time, as written in the header).
    pub started_at: NaiveDateTime,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Tables selected by the filter.
    pub tables: usize,

    /// Views selected by the filter.
    pub views: usize,

    /// Stored procedures written.
    pub procedures: usize,

    /// Stored functions written.
    pub functions: usize,

    /// Foreign-key clauses moved to the FOREIGN KEYS section.
    pub foreign_keys: usize,

    /// Rows dumped.
    pub rows: u64,

    /// INSERT statements emitted.
    pub insert_statements: u64,

    /// Bytes written to the destination.
    pub bytes_written: u64,
}

impl BackupSummary {
    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl BackupRunner {
    /// Create a runner over an existing source.
    pub fn new(source: Arc<dyn SchemaSource>, config: Config) -> Self {
        Self { config, source }
    }

    /// Connect to the configured MySQL server.
    pub async fn connect(config: Config) -> Result<Self> {
        let source = MysqlSource::connect(&config.connection).await?;
        Ok(Self::new(Arc::new(source), config))
    }

    /// Release the connection.
    pub async fn close(&self) {
        self.source.close().await;
    }

    /// Write the dump to `sink`.
    pub async fn run<W>(&self, sink: &mut OutputSink<W>) -> Result<BackupSummary>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.run_at(sink, Local::now().naive_local()).await
    }

    /// Write the dump to `{folder}/{database}_{timestamp}.sql`.
    pub async fn run_to_file(&self) -> Result<BackupSummary> {
        let started_at = Local::now().naive_local();
        let path = backup_file_path(
            &self.config.backup.output_folder(),
            self.source.database(),
            started_at,
        );
        info!("Writing backup to {}", path.display());

        let mut sink = create_file(&path).await?;
        let mut summary = self.run_at(&mut sink, started_at).await?;
        sink.finish().await?;

        summary.output_path = Some(path);
        Ok(summary)
    }

    /// Stream the dump to standard output.
    pub async fn run_to_stdout(&self) -> Result<BackupSummary> {
        let mut sink = OutputSink::new(tokio::io::stdout());
        let summary = self.run_at(&mut sink, Local::now().naive_local()).await?;
        sink.finish().await?;
        Ok(summary)
    }

    async fn run_at<W>(
        &self,
        sink: &mut OutputSink<W>,
        started_at: NaiveDateTime,
    ) -> Result<BackupSummary>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let started = Instant::now();
        let database = self.source.database().to_string();
        let show = &self.config.backup.show;

        info!("Starting backup of {}", database);

        // Discovery happens once; every section emits in this order
        let tables =
            catalog::discover(self.source.as_ref(), ObjectKind::Table, &self.config.tables).await?;
        let views =
            catalog::discover(self.source.as_ref(), ObjectKind::View, &self.config.tables).await?;
        info!("Found {} tables and {} views", tables.len(), views.len());

        let mut summary = BackupSummary {
            database: database.clone(),
            started_at,
            tables: tables.len(),
            views: views.len(),
            ..Default::default()
        };

        sink.append(&header(&database, started_at));

        if show.is_enabled(Section::Database) {
            info!("Writing database definition");
            sink.append(&banner("CREATE DB"));
            sink.append(&schema::create_database(
                &database,
                &self.config.backup.charset,
                &self.config.backup.collation,
            )?);
            sink.flush().await?;
        }

        if show.is_enabled(Section::Tables) {
            info!("Writing table definitions");
            summary.foreign_keys = self.write_tables(sink, &tables).await?;
        }

        if show.is_enabled(Section::Views) {
            info!("Writing view definitions");
            self.write_views(sink, &views).await?;
        }

        if show.is_enabled(Section::Routines) {
            info!("Writing stored routines");
            summary.procedures = self.write_routines(sink, RoutineKind::Procedure).await?;
            summary.functions = self.write_routines(sink, RoutineKind::Function).await?;
        }

        if show.is_enabled(Section::Data) {
            info!("Dumping data");
            self.write_data(sink, &tables, &mut summary).await?;
        }

        let elapsed = started.elapsed();
        sink.append(&footer(elapsed));
        sink.flush().await?;

        summary.duration_seconds = elapsed.as_secs_f64();
        summary.bytes_written = sink.bytes_written();

        info!(
            "Backup of {} complete: {} tables, {} rows in {:.1}s",
            database, summary.tables, summary.rows, summary.duration_seconds
        );
        Ok(summary)
    }

    /// Drops, creates, then the deferred foreign keys. Returns the number
    /// of foreign-key clauses moved.
    async fn write_tables<W>(&self, sink: &mut OutputSink<W>, tables: &[String]) -> Result<usize>
    where
        W: AsyncWrite + Unpin + Send,
    {
        sink.append(&banner("DROP TABLES"));
        for table in tables {
            sink.append(&schema::drop_table(table)?);
        }
        sink.append("\n");
        sink.flush().await?;

        sink.append(&banner("CREATE TABLES"));
        let mut deferred = DeferredForeignKeys::new();
        for table in tables {
            debug!("Creating table {}", table);
            let create_sql = self.source.show_create(ObjectKind::Table, table).await?;
            let table_schema = schema::create_table(table, &create_sql)?;
            deferred.defer(table, table_schema.foreign_keys);
            sink.append(&table_schema.sql);
            sink.flush().await?;
        }

        let moved = deferred.count();
        sink.append(&banner("FOREIGN KEYS"));
        for table in tables {
            let clauses = deferred.take(table);
            sink.append(&schema::foreign_keys(table, &clauses)?);
        }
        sink.flush().await?;

        debug!("Re-attached {} foreign key(s)", moved);
        Ok(moved)
    }

    async fn write_views<W>(&self, sink: &mut OutputSink<W>, views: &[String]) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        sink.append(&banner("CREATE VIEWS"));
        for view in views {
            debug!("Creating view {}", view);
            let create_sql = self.source.show_create(ObjectKind::View, view).await?;
            sink.append(&schema::create_view(view, &create_sql)?);
            sink.flush().await?;
        }
        sink.flush().await
    }

    async fn write_routines<W>(&self, sink: &mut OutputSink<W>, kind: RoutineKind) -> Result<usize>
    where
        W: AsyncWrite + Unpin + Send,
    {
        sink.append(&banner(&format!("CREATE {}S", kind.keyword())));
        let names = catalog::list_routines(self.source.as_ref(), kind).await?;
        for name in &names {
            debug!("Creating {} {}", kind, name);
            let create_sql = self.source.show_create_routine(kind, name).await?;
            sink.append(&schema::routine(kind, name, &create_sql)?);
            sink.flush().await?;
        }
        sink.flush().await?;
        Ok(names.len())
    }

    async fn write_data<W>(
        &self,
        sink: &mut OutputSink<W>,
        tables: &[String],
        summary: &mut BackupSummary,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        sink.append(&banner("TRUNCATE DATA"));
        sink.append(FOREIGN_KEY_CHECKS_OFF);
        for table in tables {
            sink.append(&schema::truncate_table(table)?);
        }
        sink.append("\n");
        sink.append(FOREIGN_KEY_CHECKS_ON);
        sink.flush().await?;

        sink.append(&banner("DUMP DATA"));
        sink.append(FOREIGN_KEY_CHECKS_OFF);
        sink.append(&time_zone_prologue());
        for table in tables {
            let stats =
                dump_table(self.source.as_ref(), sink, table, self.config.backup.batch_size)
                    .await?;
            summary.rows += stats.rows;
            summary.insert_statements += stats.statements;
            info!("{}: {} rows", table, stats.rows);
        }
        sink.append(TIME_ZONE_EPILOGUE);
        sink.append(FOREIGN_KEY_CHECKS_ON);
        sink.flush().await
    }
}
