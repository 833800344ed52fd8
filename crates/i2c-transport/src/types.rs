/// Lowest usable 7-bit address; 0x00..=0x07 are reserved.
pub const ADDRESS_MIN: u8 = 0x08;
/// Highest usable 7-bit address; 0x78..=0x7f are reserved.
pub const ADDRESS_MAX: u8 = 0x77;

#[derive(Clone, Debug)]
pub struct BusInfo {
    pub name: String,
    pub driver: String,
}
