//! Small records used by the scenario tests.

pub struct Checkpoint {
    pub epoch: u64,
    #[ssz(size = "32")]
    pub root: Vec<u8>,
}

pub struct Counted {
    pub count: u32,
    #[ssz(max = "16")]
    pub values: Vec<u64>,
}

pub struct Roots {
    #[ssz(size = "?,32", max = "10")]
    pub roots: Vec<Vec<u8>>,
    #[ssz(size = "2,4")]
    pub pair: Vec<Vec<u8>>,
}

pub struct Flags {
    pub enabled: bool,
    pub tag: u8,
    pub kind: u16,
    #[ssz(bitvector, size = "12")]
    pub mask: Vec<u8>,
    #[ssz(bitvector, size = "16")]
    pub wide: [u8; 2],
    pub r#type: u8,
    pub xxx_cache: Vec<u8>,
}

pub struct Empty {}
