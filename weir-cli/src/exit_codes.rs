pub const SUCCESS: i32 = 0;
pub const RUNTIME_ERROR: i32 = 1;
pub const VALIDATION_ERROR: i32 = 2;
pub const IO_ERROR: i32 = 3;
