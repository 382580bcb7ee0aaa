//! Nested records: containers, boxed containers, bit lists and collections
//! of dynamic items.

pub struct AttestationData {
    pub slot: u64,
    pub index: u64,
    #[ssz(size = "32")]
    pub beacon_block_root: Vec<u8>,
    pub source: Checkpoint,
    pub target: Box<Checkpoint>,
}

pub struct Attestation {
    #[ssz(bitlist, max = "2048")]
    pub aggregation_bits: Vec<u8>,
    pub data: AttestationData,
    pub signature: [u8; 96],
}

pub struct SyncAggregate {
    #[ssz(max = "64")]
    pub participants: sszgen_core::bitlist::Bitlist,
    pub root: [u8; 32],
}

pub struct Body {
    #[ssz(max = "128")]
    pub attestations: Vec<Attestation>,
    #[ssz(max = "1024")]
    pub graffiti: Vec<u8>,
    pub sync: SyncAggregate,
    #[ssz(max = "8")]
    pub deposits: Vec<Checkpoint>,
}

pub struct Block {
    pub slot: u64,
    pub proposer_index: u64,
    pub body: Box<Body>,
    #[ssz(max = "4")]
    pub lanes: Vec<Vec<u16>>,
    #[ssz(size = "2")]
    pub notes: Vec<Note>,
}

pub struct Note {
    pub id: u16,
    #[ssz(max = "32")]
    pub text: Vec<u8>,
}
