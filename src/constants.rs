pub const DEFAULT_DATABASE: &str = "(default)";

pub const AUTO_ID_LENGTH: usize = 20;
