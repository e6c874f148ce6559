//! Transaction types classify how money moved, e.g. income, expense or transfer.

mod core;
mod endpoints;

pub use core::{
    TransactionType, TransactionTypeData, create_transaction_type,
    create_transaction_type_table, delete_transaction_type, get_all_transaction_types,
    get_transaction_type, update_transaction_type,
};
pub use endpoints::{
    create_transaction_type_endpoint, delete_transaction_type_endpoint,
    get_transaction_type_endpoint, list_transaction_types_endpoint,
    update_transaction_type_endpoint,
};
