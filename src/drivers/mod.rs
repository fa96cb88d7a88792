// Hardware drivers: chip-level and protocol-level, board-independent.
//
// Each module is reusable across boards; only pin assignments and bus
// wiring (board/ and the firmware crate) are board-specific.

pub mod ili948x;
pub mod sdcard;
pub mod storage;
