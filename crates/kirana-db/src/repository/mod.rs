//! # Repository Module
//!
//! One repository per table family. Repositories own a pool clone and serve
//! reads; stock and invoice writes go through [`crate::LedgerTx`], which
//! reuses the `pub(crate)` connection-level functions in these modules.
//!
//! ## Available Repositories
//!
//! - [`TaxSlabRepository`] - GST slab master data
//! - [`SupplierRepository`] / [`CustomerRepository`] - parties
//! - [`ProductRepository`] - product catalogue
//! - [`BatchRepository`] - purchase lots, FIFO order, expiry windows
//! - [`MovementRepository`] - append-only stock journal
//! - [`InvoiceRepository`] - posted and voided invoices, sales summaries

pub mod batch;
pub mod customer;
pub mod invoice;
pub mod movement;
pub mod product;
pub mod supplier;
pub mod tax_slab;

pub use batch::BatchRepository;
pub use customer::CustomerRepository;
pub use invoice::{InvoiceRepository, ProductSales};
pub use movement::MovementRepository;
pub use product::ProductRepository;
pub use supplier::SupplierRepository;
pub use tax_slab::TaxSlabRepository;
