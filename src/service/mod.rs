//! CrudService: generic CRUD using safe SQL builder.

mod crud;
mod validation;
pub use crud::{day_window, is_truthy_or_zero, CrudService, PageRequest, Record, SERVICE_TIMEZONE};
pub use validation::RequestValidator;
