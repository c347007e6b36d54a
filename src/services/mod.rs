pub mod ledger;
pub mod quote_pdf;
pub mod title_generator;

pub use ledger::{EnvelopeLedger, SavedEnvelopeRecord, StatusLookup, StatusScan};
pub use quote_pdf::QuotePdfBuilder;
pub use title_generator::random_title;
