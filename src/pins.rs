//! GPIO pin assignments for the controller board.
//!
//! Single source of truth: the binary reads these when it claims the
//! peripherals.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Rotary encoder (KY-040, external or on-board pull-ups)
// ---------------------------------------------------------------------------

/// Encoder clock line; a falling edge marks one detent.
pub const ENCODER_CLK_GPIO: i32 = 13;
/// Encoder data line; its level at the CLK edge gives the direction.
pub const ENCODER_DT_GPIO: i32 = 12;
/// Push switch, active LOW.
pub const ENCODER_SW_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// Status LED
// ---------------------------------------------------------------------------

/// On-board LED, active HIGH.
pub const STATUS_LED_GPIO: i32 = 2;
