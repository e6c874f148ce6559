//! Categories group transactions by what the money was for, e.g. groceries or rent.

mod core;
mod endpoints;

pub use core::{
    Category, CategoryData, create_category, create_category_table, delete_category,
    get_all_categories, get_category, update_category,
};
pub use endpoints::{
    create_category_endpoint, delete_category_endpoint, get_category_endpoint,
    list_categories_endpoint, update_category_endpoint,
};
