//! Accounts hold the balance of a bank account, credit card or other store of money.

mod core;
mod endpoints;

pub use core::{
    Account, AccountData, create_account, create_account_table, delete_account, get_account,
    get_all_accounts, update_account,
};
pub use endpoints::{
    create_account_endpoint, delete_account_endpoint, get_account_endpoint,
    list_accounts_endpoint, update_account_endpoint,
};
