//! Property definitions for the EZRadio
//!
//! Properties are the EZRadio's configuration registers. They are addressed
//! by a group and an index inside the group; the driver encodes both into the
//! 16 bit register id as `group << 8 | index` and accesses them with
//! [`Device::get_property`](crate::Device::get_property) and
//! [`Device::set_property`](crate::Device::set_property).

mod modem;

pub use modem::*;

/// Split a property id into its `(group, index)` pair.
pub const fn split_id(id: u16) -> (u8, u8) {
    ((id >> 8) as u8, id as u8)
}
