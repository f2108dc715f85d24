use crate::objects::object::{Object, ObjectKind};

/// Immutable interned string: identity (pointer equality) implies content equality
/// everywhere else in the VM, once a string has passed through the intern pool.
#[repr(C)]
pub struct ObjString {
    pub object: Object,
    pub hash: u32,
    pub chars: String,
}

impl ObjString {
    pub fn new(chars: String) -> Box<ObjString> {
        let hash = fnv1a_hash(chars.as_bytes());
        Box::new(ObjString { object: Object::new(ObjectKind::String), hash, chars })
    }
}

/// FNV-1a, 32-bit, per the spec's precomputed-hash requirement.
pub fn fnv1a_hash(bytes: &[u8]) -> u32 {
    const FNV_OFFSET_BASIS: u32 = 2166136261;
    const FNV_PRIME: u32 = 16777619;
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
