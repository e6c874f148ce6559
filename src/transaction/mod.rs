//! Transactions record money moving in or out of an account.

mod core;
mod endpoints;

pub use core::{
    Transaction, TransactionData, TransactionFilter, create_transaction,
    create_transaction_table, delete_transaction, get_transaction, get_transactions,
    update_transaction,
};
pub use endpoints::{
    create_transaction_endpoint, delete_transaction_endpoint,
    get_transaction_endpoint, list_transactions_endpoint, update_transaction_endpoint,
};
