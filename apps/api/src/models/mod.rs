pub mod gift;
pub mod ledger;
