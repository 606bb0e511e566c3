pub mod history;
pub mod interaction;
pub mod proposal;
pub mod viewport;
