/*
 * Window-independent helpers: encoding detection and decoding of raw text
 * buffers, backslash-separated path text, string predicates and splitting,
 * and file time conversion.
 */

pub mod bin;
pub mod path;
pub mod str_utils;
pub mod time;
