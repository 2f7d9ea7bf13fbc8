pub mod delta;
pub mod quantize;
pub mod vbyte;
