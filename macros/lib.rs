pub use options::{build_option_enum, build_options, explicit_options, use_option};
pub use testing::value_parameterized_test;
