//! Shared protocol constants for the sendtree wire format

// Default receiver endpoint
pub const DEFAULT_SERVER: &str = "localhost:4040";

// Name length prefix: u16, little-endian
pub const NAME_LEN_BYTES: usize = 2;
pub const MAX_NAME_LEN: usize = u16::MAX as usize;

// Body length prefix used only by the length-prefixed frame variant: u64, little-endian
pub const BODY_LEN_BYTES: usize = 8;

// Names on the wire never carry raw spaces
pub const SPACE: char = ' ';
pub const SPACE_REPLACEMENT: char = '_';

// Separator used when the relative path is sent instead of the base name
pub const WIRE_PATH_SEPARATOR: char = '/';
