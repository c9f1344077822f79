//! SQLite persistence for the board relay.
//!
//! One durable record per instance, container, panel, and grid, each
//! scoped by board id and owner id. The authority writes through on every
//! accepted mutation and reads a whole board back on lazy cache load.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::store::{Container, GridSpec, Instance, InstanceProps, Panel};

pub struct BoardDb {
    conn: Connection,
}

/// Everything persisted for one board, as loaded for cache hydration.
#[derive(Debug)]
pub struct StoredBoard {
    pub grid: GridSpec,
    pub owner_id: Option<String>,
    pub instances: Vec<Instance>,
    pub containers: Vec<Container>,
    pub panels: Vec<Panel>,
}

impl BoardDb {
    /// Open (or create) a SQLite database at the given path and run
    /// migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS grids (
                    board_id TEXT PRIMARY KEY,
                    owner_id TEXT,
                    rows INTEGER NOT NULL DEFAULT 2,
                    cols INTEGER NOT NULL DEFAULT 3,
                    row_sizes TEXT NOT NULL DEFAULT '[]',
                    col_sizes TEXT NOT NULL DEFAULT '[]',
                    name TEXT NOT NULL DEFAULT ''
                );

                CREATE TABLE IF NOT EXISTS instances (
                    board_id TEXT NOT NULL,
                    instance_id TEXT NOT NULL,
                    owner_id TEXT,
                    label TEXT NOT NULL DEFAULT 'Untitled',
                    parent INTEGER NOT NULL DEFAULT 0,
                    sortable INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (board_id, instance_id)
                );

                CREATE TABLE IF NOT EXISTS containers (
                    board_id TEXT NOT NULL,
                    container_id TEXT NOT NULL,
                    owner_id TEXT,
                    items TEXT NOT NULL DEFAULT '[]',
                    PRIMARY KEY (board_id, container_id)
                );

                CREATE TABLE IF NOT EXISTS panels (
                    board_id TEXT NOT NULL,
                    panel_id TEXT NOT NULL,
                    owner_id TEXT,
                    kind TEXT NOT NULL DEFAULT 'taskbox',
                    row INTEGER NOT NULL DEFAULT 0,
                    col INTEGER NOT NULL DEFAULT 0,
                    width INTEGER NOT NULL DEFAULT 1,
                    height INTEGER NOT NULL DEFAULT 1,
                    container_id TEXT NOT NULL,
                    PRIMARY KEY (board_id, panel_id)
                );

                CREATE TABLE IF NOT EXISTS sessions (
                    token TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_instances_board ON instances(board_id);
                CREATE INDEX IF NOT EXISTS idx_containers_board ON containers(board_id);
                CREATE INDEX IF NOT EXISTS idx_panels_board ON panels(board_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Grids ────────────────────────────────────────────────────────

    pub fn upsert_grid(
        &self,
        board_id: &str,
        owner_id: Option<&str>,
        grid: &GridSpec,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO grids (board_id, owner_id, rows, cols, row_sizes, col_sizes, name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(board_id) DO UPDATE SET
                     rows = excluded.rows,
                     cols = excluded.cols,
                     row_sizes = excluded.row_sizes,
                     col_sizes = excluded.col_sizes,
                     name = excluded.name",
                params![
                    board_id,
                    owner_id,
                    grid.rows,
                    grid.cols,
                    serde_json::to_string(&grid.row_sizes)?,
                    serde_json::to_string(&grid.col_sizes)?,
                    grid.name,
                ],
            )
            .context("Failed to upsert grid")?;
        Ok(())
    }

    // ── Instances ────────────────────────────────────────────────────

    pub fn upsert_instance(
        &self,
        board_id: &str,
        owner_id: Option<&str>,
        instance: &Instance,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO instances (board_id, instance_id, owner_id, label, parent, sortable)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(board_id, instance_id) DO UPDATE SET
                     label = excluded.label,
                     parent = excluded.parent,
                     sortable = excluded.sortable",
                params![
                    board_id,
                    instance.instance_id,
                    owner_id,
                    instance.label,
                    instance.props.parent,
                    instance.props.sortable,
                ],
            )
            .context("Failed to upsert instance")?;
        Ok(())
    }

    pub fn delete_instance(&self, board_id: &str, instance_id: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM instances WHERE board_id = ?1 AND instance_id = ?2",
                params![board_id, instance_id],
            )
            .context("Failed to delete instance")?;
        Ok(())
    }

    // ── Containers ───────────────────────────────────────────────────

    pub fn upsert_container(
        &self,
        board_id: &str,
        owner_id: Option<&str>,
        container_id: &str,
        items: &[String],
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO containers (board_id, container_id, owner_id, items)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(board_id, container_id) DO UPDATE SET
                     items = excluded.items",
                params![
                    board_id,
                    container_id,
                    owner_id,
                    serde_json::to_string(items)?
                ],
            )
            .context("Failed to upsert container")?;
        Ok(())
    }

    // ── Panels ───────────────────────────────────────────────────────

    pub fn upsert_panel(&self, board_id: &str, owner_id: Option<&str>, panel: &Panel) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO panels
                     (board_id, panel_id, owner_id, kind, row, col, width, height, container_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(board_id, panel_id) DO UPDATE SET
                     kind = excluded.kind,
                     row = excluded.row,
                     col = excluded.col,
                     width = excluded.width,
                     height = excluded.height,
                     container_id = excluded.container_id",
                params![
                    board_id,
                    panel.id,
                    owner_id,
                    panel.kind.as_str(),
                    panel.row,
                    panel.col,
                    panel.width,
                    panel.height,
                    panel.container_id,
                ],
            )
            .context("Failed to upsert panel")?;
        Ok(())
    }

    // ── Board load ───────────────────────────────────────────────────

    /// Load everything persisted for one board, or `None` when the grid
    /// record does not exist.
    pub fn load_board(&self, board_id: &str) -> Result<Option<StoredBoard>> {
        let grid_row = self
            .conn
            .query_row(
                "SELECT owner_id, rows, cols, row_sizes, col_sizes, name
                 FROM grids WHERE board_id = ?1",
                params![board_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()
            .context("Failed to load grid")?;

        let Some((owner_id, rows, cols, row_sizes, col_sizes, name)) = grid_row else {
            return Ok(None);
        };
        let grid = GridSpec {
            rows,
            cols,
            row_sizes: serde_json::from_str(&row_sizes).unwrap_or_default(),
            col_sizes: serde_json::from_str(&col_sizes).unwrap_or_default(),
            name,
        };

        let mut stmt = self.conn.prepare(
            "SELECT instance_id, label, parent, sortable FROM instances WHERE board_id = ?1",
        )?;
        let instances = stmt
            .query_map(params![board_id], |row| {
                Ok(Instance {
                    instance_id: row.get(0)?,
                    label: row.get(1)?,
                    props: InstanceProps {
                        parent: row.get(2)?,
                        sortable: row.get(3)?,
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to load instances")?;

        let mut stmt = self
            .conn
            .prepare("SELECT container_id, items FROM containers WHERE board_id = ?1")?;
        let containers = stmt
            .query_map(params![board_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to load containers")?
            .into_iter()
            .map(|(container_id, items)| Container {
                container_id,
                items: serde_json::from_str(&items).unwrap_or_default(),
            })
            .collect();

        let mut stmt = self.conn.prepare(
            "SELECT panel_id, kind, row, col, width, height, container_id
             FROM panels WHERE board_id = ?1",
        )?;
        let panels = stmt
            .query_map(params![board_id], |row| {
                Ok(Panel {
                    id: row.get(0)?,
                    kind: row
                        .get::<_, String>(1)?
                        .parse()
                        .unwrap_or(crate::store::PanelKind::Taskbox),
                    row: row.get(2)?,
                    col: row.get(3)?,
                    width: row.get(4)?,
                    height: row.get(5)?,
                    container_id: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to load panels")?;

        Ok(Some(StoredBoard {
            grid,
            owner_id,
            instances,
            containers,
            panels,
        }))
    }

    // ── Sessions (auth collaborator) ─────────────────────────────────

    pub fn insert_session(&self, token: &str, user_id: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sessions (token, user_id) VALUES (?1, ?2)",
                params![token, user_id],
            )
            .context("Failed to insert session")?;
        Ok(())
    }

    pub fn lookup_session(&self, token: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT user_id FROM sessions WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up session")
    }
}
