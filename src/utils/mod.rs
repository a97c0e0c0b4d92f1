pub mod file_reference;
