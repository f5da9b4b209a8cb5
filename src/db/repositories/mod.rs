pub mod process_state;
pub mod trades;
