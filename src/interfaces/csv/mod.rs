pub mod command_reader;
pub mod commands;
pub mod report_writer;
