//! # Invoice Repository
//!
//! An invoice is stored across three tables:
//!
//! ```text
//! invoices              one row: number, status, totals
//!   └── invoice_lines   one row per line: qty, price, tax breakdown
//!         └── invoice_line_batches   one row per FIFO take: batch, qty, cost
//! ```
//!
//! Multi-table reads run inside one read transaction so a line never
//! appears without its header. Inserts and status changes happen inside the
//! engine's write transaction via [`crate::LedgerTx`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kirana_core::{
    BatchTake, Invoice, InvoiceLine, InvoiceStatus, InvoiceTotals, Jurisdiction, TaxBreakdown,
};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: String,
    number: i64,
    display_number: String,
    customer_id: String,
    jurisdiction: Jurisdiction,
    status: InvoiceStatus,
    subtotal_paise: i64,
    cgst_paise: i64,
    sgst_paise: i64,
    igst_paise: i64,
    cess_paise: i64,
    total_tax_paise: i64,
    grand_total_paise: i64,
    created_at: DateTime<Utc>,
    posted_at: Option<DateTime<Utc>>,
    voided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct LineRow {
    line_no: i64,
    product_id: String,
    product_name: String,
    quantity: i64,
    unit_price_paise: i64,
    subtotal_paise: i64,
    cgst_paise: i64,
    sgst_paise: i64,
    igst_paise: i64,
    cess_paise: i64,
    total_tax_paise: i64,
    line_total_paise: i64,
}

#[derive(Debug, FromRow)]
struct TakeRow {
    line_no: i64,
    batch_id: String,
    quantity: i64,
    unit_cost_paise: i64,
}

/// Quantity and revenue per product over posted invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, TS)]
#[ts(export)]
pub struct ProductSales {
    pub product_id: String,
    pub product_name: String,
    pub quantity_sold: i64,
    /// Pre-tax revenue.
    pub revenue_paise: i64,
    pub tax_paise: i64,
    pub invoice_count: i64,
}

const INVOICE_COLUMNS: &str = r#"
    SELECT
        id, number, display_number, customer_id, jurisdiction, status,
        subtotal_paise, cgst_paise, sgst_paise, igst_paise, cess_paise,
        total_tax_paise, grand_total_paise, created_at, posted_at, voided_at
    FROM invoices
"#;

// =============================================================================
// Repository
// =============================================================================

/// Read access to invoices.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut tx = self.pool.begin().await?;
        let invoice = load(&mut tx, id).await?;
        tx.commit().await?;
        Ok(invoice)
    }

    pub async fn get_by_number(&self, number: i64) -> DbResult<Option<Invoice>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("{} WHERE number = ?1", INVOICE_COLUMNS);
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(number)
            .fetch_optional(&mut *tx)
            .await?;
        let invoice = match row {
            Some(row) => Some(assemble(&mut tx, row).await?),
            None => None,
        };
        tx.commit().await?;
        Ok(invoice)
    }

    /// Every invoice of a customer (posted and voided), by number.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Invoice>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("{} WHERE customer_id = ?1 ORDER BY number", INVOICE_COLUMNS);
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *tx)
            .await?;
        let invoices = assemble_all(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(invoices)
    }

    /// Posted (not voided) invoices with `from <= posted_at < to`.
    pub async fn list_posted_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Invoice>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "{} WHERE status = 'posted' AND posted_at >= ?1 AND posted_at < ?2 ORDER BY number",
            INVOICE_COLUMNS
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&mut *tx)
            .await?;
        let invoices = assemble_all(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(invoices)
    }

    /// Per-product quantity and revenue over posted invoices, best sellers
    /// first.
    pub async fn product_sales(&self) -> DbResult<Vec<ProductSales>> {
        let rows = sqlx::query_as::<_, ProductSales>(
            r#"
            SELECT
                l.product_id                   AS product_id,
                MAX(l.product_name)            AS product_name,
                SUM(l.quantity)                AS quantity_sold,
                SUM(l.subtotal_paise)          AS revenue_paise,
                SUM(l.total_tax_paise)         AS tax_paise,
                COUNT(DISTINCT l.invoice_id)   AS invoice_count
            FROM invoice_lines l
            INNER JOIN invoices i ON i.id = l.invoice_id
            WHERE i.status = 'posted'
            GROUP BY l.product_id
            ORDER BY quantity_sold DESC, product_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Highest invoice number issued so far (0 before the first posting).
    pub async fn last_number(&self) -> DbResult<i64> {
        let last: i64 =
            sqlx::query_scalar("SELECT last_value FROM sequences WHERE name = 'invoice'")
                .fetch_one(&self.pool)
                .await?;
        Ok(last)
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

pub(crate) async fn load(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
    let sql = format!("{} WHERE id = ?1", INVOICE_COLUMNS);
    let row = sqlx::query_as::<_, InvoiceRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(assemble(conn, row).await?)),
        None => Ok(None),
    }
}

async fn assemble_all(conn: &mut SqliteConnection, rows: Vec<InvoiceRow>) -> DbResult<Vec<Invoice>> {
    let mut invoices = Vec::with_capacity(rows.len());
    for row in rows {
        invoices.push(assemble(conn, row).await?);
    }
    Ok(invoices)
}

async fn assemble(conn: &mut SqliteConnection, row: InvoiceRow) -> DbResult<Invoice> {
    let line_rows = sqlx::query_as::<_, LineRow>(
        r#"
        SELECT
            line_no, product_id, product_name, quantity, unit_price_paise,
            subtotal_paise, cgst_paise, sgst_paise, igst_paise, cess_paise,
            total_tax_paise, line_total_paise
        FROM invoice_lines
        WHERE invoice_id = ?1
        ORDER BY line_no
        "#,
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    let take_rows = sqlx::query_as::<_, TakeRow>(
        r#"
        SELECT line_no, batch_id, quantity, unit_cost_paise
        FROM invoice_line_batches
        WHERE invoice_id = ?1
        ORDER BY line_no, seq
        "#,
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    let mut lines: Vec<InvoiceLine> = line_rows
        .into_iter()
        .map(|l| InvoiceLine {
            line_no: l.line_no,
            product_id: l.product_id,
            product_name: l.product_name,
            quantity: l.quantity,
            unit_price_paise: l.unit_price_paise,
            subtotal_paise: l.subtotal_paise,
            tax: TaxBreakdown {
                cgst_paise: l.cgst_paise,
                sgst_paise: l.sgst_paise,
                igst_paise: l.igst_paise,
                cess_paise: l.cess_paise,
                total_tax_paise: l.total_tax_paise,
            },
            line_total_paise: l.line_total_paise,
            takes: Vec::new(),
        })
        .collect();

    for take in take_rows {
        let line = lines
            .iter_mut()
            .find(|l| l.line_no == take.line_no)
            .ok_or_else(|| DbError::CorruptRow {
                table: "invoice_line_batches".to_string(),
                reason: format!("invoice {} has no line {}", row.id, take.line_no),
            })?;
        line.takes.push(BatchTake {
            batch_id: take.batch_id,
            quantity: take.quantity,
            unit_cost_paise: take.unit_cost_paise,
        });
    }

    Ok(Invoice {
        id: row.id,
        number: row.number,
        display_number: row.display_number,
        customer_id: row.customer_id,
        jurisdiction: row.jurisdiction,
        status: row.status,
        lines,
        totals: InvoiceTotals {
            subtotal_paise: row.subtotal_paise,
            cgst_paise: row.cgst_paise,
            sgst_paise: row.sgst_paise,
            igst_paise: row.igst_paise,
            cess_paise: row.cess_paise,
            total_tax_paise: row.total_tax_paise,
            grand_total_paise: row.grand_total_paise,
        },
        created_at: row.created_at,
        posted_at: row.posted_at,
        voided_at: row.voided_at,
    })
}

/// Writes header, lines and batch takes.
pub(crate) async fn insert(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    let totals = &invoice.totals;

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, number, display_number, customer_id, jurisdiction, status,
            subtotal_paise, cgst_paise, sgst_paise, igst_paise, cess_paise,
            total_tax_paise, grand_total_paise, created_at, posted_at, voided_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        "#,
    )
    .bind(&invoice.id)
    .bind(invoice.number)
    .bind(&invoice.display_number)
    .bind(&invoice.customer_id)
    .bind(invoice.jurisdiction)
    .bind(invoice.status)
    .bind(totals.subtotal_paise)
    .bind(totals.cgst_paise)
    .bind(totals.sgst_paise)
    .bind(totals.igst_paise)
    .bind(totals.cess_paise)
    .bind(totals.total_tax_paise)
    .bind(totals.grand_total_paise)
    .bind(invoice.created_at)
    .bind(invoice.posted_at)
    .bind(invoice.voided_at)
    .execute(&mut *conn)
    .await?;

    for line in &invoice.lines {
        sqlx::query(
            r#"
            INSERT INTO invoice_lines (
                invoice_id, line_no, product_id, product_name, quantity, unit_price_paise,
                subtotal_paise, cgst_paise, sgst_paise, igst_paise, cess_paise,
                total_tax_paise, line_total_paise
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&invoice.id)
        .bind(line.line_no)
        .bind(&line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price_paise)
        .bind(line.subtotal_paise)
        .bind(line.tax.cgst_paise)
        .bind(line.tax.sgst_paise)
        .bind(line.tax.igst_paise)
        .bind(line.tax.cess_paise)
        .bind(line.tax.total_tax_paise)
        .bind(line.line_total_paise)
        .execute(&mut *conn)
        .await?;

        for (seq, take) in line.takes.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO invoice_line_batches (
                    invoice_id, line_no, seq, batch_id, quantity, unit_cost_paise
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&invoice.id)
            .bind(line.line_no)
            .bind(seq as i64)
            .bind(&take.batch_id)
            .bind(take.quantity)
            .bind(take.unit_cost_paise)
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(())
}

/// Flips a posted invoice to voided. Totals are untouched.
pub(crate) async fn mark_voided(
    conn: &mut SqliteConnection,
    id: &str,
    at: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE invoices
        SET status = 'voided', voided_at = ?2
        WHERE id = ?1 AND status = 'posted'
        "#,
    )
    .bind(id)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Posted invoice", id));
    }

    Ok(())
}

/// Takes the next invoice number from the sequence. Rolled back together
/// with the rest of the transaction, so a failed posting leaves no gap.
pub(crate) async fn next_number(conn: &mut SqliteConnection) -> DbResult<i64> {
    let number: i64 = sqlx::query_scalar(
        r#"
        UPDATE sequences
        SET last_value = last_value + 1
        WHERE name = 'invoice'
        RETURNING last_value
        "#,
    )
    .fetch_one(&mut *conn)
    .await?;

    Ok(number)
}

/// Helper to generate a new invoice ID.
pub fn generate_invoice_id() -> String {
    Uuid::new_v4().to_string()
}
