//! Integration tests for the binary object serializer.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Quat, Vec3};
use half::f16;
use netszr_serializer::{
    BinarySerializer, NetSerializable, SerializerError, TypeTableBuilder, from_slice, to_vec,
};
use netszr_strings::MappedStringDict;
use netszr_wire::{LegacyBitArray, WireReader, WireWriter};
use serde::{Deserialize, Serialize};

// -- Helpers ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Command {
    Move { direction: Vec3 },
    Examine(String),
    Drop,
}

impl NetSerializable for Command {
    const WIRE_NAME: &'static str = "Command";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EntityState {
    prototype: String,
    sprite: Option<String>,
    rotation: Quat,
    health: f32,
    tags: Vec<String>,
    components: BTreeMap<String, i32>,
    queued: Vec<Command>,
}

impl NetSerializable for EntityState {
    const WIRE_NAME: &'static str = "EntityState";
}

/// Stands in for a type owned by another subsystem with its own layout.
#[derive(Debug, PartialEq)]
struct TileRef {
    grid: u16,
    index: u32,
}

fn encode_tile(
    tile: &TileRef,
    w: &mut WireWriter,
    _strings: &netszr_strings::MappedStrings,
) -> Result<(), SerializerError> {
    w.write_varint(u64::from(tile.grid));
    w.write_varint(u64::from(tile.index));
    Ok(())
}

fn decode_tile(
    r: &mut WireReader<'_>,
    _strings: &netszr_strings::MappedStrings,
) -> Result<TileRef, SerializerError> {
    let grid = u16::try_from(r.read_varint()?)
        .map_err(|_| SerializerError::Message("grid id out of range".into()))?;
    Ok(TileRef {
        grid,
        index: r.read_varint_u32()?,
    })
}

#[derive(Debug, Serialize, Deserialize)]
enum Tree {
    Leaf,
    Node(Box<Tree>),
}

impl NetSerializable for Tree {
    const WIRE_NAME: &'static str = "Tree";
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct LightLevel {
    name: String,
    #[serde(with = "netszr_wire::f16_nan_safe")]
    intensity: f16,
}

impl NetSerializable for LightLevel {
    const WIRE_NAME: &'static str = "LightLevel";
}

fn dict() -> Arc<MappedStringDict> {
    let dict = MappedStringDict::default();
    dict.add_strings(
        ["textures/metal_wall", "Objects/Storage/crate.rsi", "SteelFloorTile"],
        "prototypes",
    )
    .unwrap();
    dict.finalize().unwrap();
    Arc::new(dict)
}

fn serializer() -> BinarySerializer {
    let table = TypeTableBuilder::new()
        .register::<Command>()
        .register::<EntityState>()
        .register::<Tree>()
        .register::<LightLevel>()
        .register_custom::<TileRef>("TileRef", encode_tile, decode_tile)
        .build()
        .unwrap();
    BinarySerializer::new(Arc::new(table), dict())
}

/// The generic-form type id of `Tree`.
fn tree_prefix(s: &BinarySerializer) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.write_varint(u64::from(s.table().id_of::<Tree>().unwrap()));
    w.into_bytes()
}

fn sample_state() -> EntityState {
    EntityState {
        prototype: "SteelFloorTile".into(),
        sprite: Some("Objects/Storage/crate.rsi".into()),
        rotation: Quat::from_xyzw(0.0, 0.0, 0.707, 0.707),
        health: 87.5,
        tags: vec!["metal".into(), "never seen before".into()],
        components: BTreeMap::from([("wall".into(), 3), ("Transform".into(), -1)]),
        queued: vec![
            Command::Move {
                direction: Vec3::new(1.0, 0.0, -1.0),
            },
            Command::Examine("crate".into()),
            Command::Drop,
        ],
    }
}

// =========================================================================
// Round trips
// =========================================================================

#[test]
fn test_roundtrip_nested_struct() {
    let s = serializer();
    let state = sample_state();

    let bytes = s.serialize(&state).unwrap();
    let object = s.deserialize(&bytes).unwrap();

    assert_eq!(object.wire_name(), "EntityState");
    assert_eq!(object.downcast::<EntityState>().unwrap(), state);
}

#[test]
fn test_roundtrip_custom_codec() {
    let s = serializer();
    let tile = TileRef {
        grid: 4,
        index: 70_000,
    };

    let bytes = s.serialize(&tile).unwrap();
    assert_eq!(s.deserialize_as::<TileRef>(&bytes).unwrap(), tile);
}

#[test]
fn test_roundtrip_builtins() {
    let s = serializer();

    assert_eq!(s.deserialize_as::<i64>(&s.serialize(&i64::MIN).unwrap()).unwrap(), i64::MIN);
    assert_eq!(s.deserialize_as::<u64>(&s.serialize(&u64::MAX).unwrap()).unwrap(), u64::MAX);
    assert_eq!(
        s.deserialize_as::<Vec<u8>>(&s.serialize(&vec![0u8, 255, 7]).unwrap()).unwrap(),
        vec![0, 255, 7]
    );
    assert_eq!(
        s.deserialize_as::<f16>(&s.serialize(&f16::from_f32(1.5)).unwrap()).unwrap(),
        f16::from_f32(1.5)
    );

    let bits = LegacyBitArray::from_bools(&[true, false, true]);
    assert_eq!(
        s.deserialize_as::<LegacyBitArray>(&s.serialize(&bits).unwrap()).unwrap(),
        bits
    );
}

#[test]
fn test_nan_reads_back_as_zero() {
    let s = serializer();
    let mut state = sample_state();
    state.health = f32::NAN;
    state.rotation = Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0);

    let back: EntityState = s.deserialize_as(&s.serialize(&state).unwrap()).unwrap();

    assert_eq!(back.health, 0.0);
    assert_eq!(back.rotation, Quat::from_xyzw(0.0, 0.0, 0.0, 1.0));
    assert_eq!(
        s.deserialize_as::<f64>(&s.serialize(&f64::NAN).unwrap()).unwrap(),
        0.0
    );
    assert_eq!(
        s.deserialize_as::<f16>(&s.serialize(&f16::NAN).unwrap()).unwrap(),
        f16::ZERO
    );
}

#[test]
fn test_f16_field_nan_reads_back_as_zero() {
    let s = serializer();
    let light = LightLevel {
        name: "wall".into(),
        intensity: f16::NAN,
    };

    let back: LightLevel = s.deserialize_as(&s.serialize(&light).unwrap()).unwrap();
    assert_eq!(back.intensity, f16::ZERO);

    let lit = LightLevel {
        name: "wall".into(),
        intensity: f16::from_f32(0.75),
    };
    assert_eq!(s.deserialize_as::<LightLevel>(&s.serialize(&lit).unwrap()).unwrap(), lit);
}

#[test]
fn test_f16_field_matches_wire_layout() {
    let dict = dict();
    let strings = dict.frozen().unwrap();

    #[derive(Serialize)]
    struct Only(#[serde(with = "netszr_wire::f16_nan_safe")] f16);

    let value = f16::from_f32(-2.5);
    assert_eq!(to_vec(&Only(value), strings).unwrap(), netszr_wire::to_bytes(&value));
}

// =========================================================================
// Determinism and compactness
// =========================================================================

#[test]
fn test_same_value_same_bytes_across_instances() {
    let a = serializer().serialize(&sample_state()).unwrap();
    let b = serializer().serialize(&sample_state()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_mapped_string_is_compact() {
    let dict = dict();
    let strings = dict.frozen().unwrap();

    let mapped = to_vec("wall", strings).unwrap();
    let unmapped = to_vec("a string nobody registered", strings).unwrap();

    assert!(mapped.len() <= 2, "mapped string took {} bytes", mapped.len());
    assert!(unmapped.len() > "a string nobody registered".len());
    assert_eq!(from_slice::<String>(&mapped, strings).unwrap(), "wall");
}

// =========================================================================
// Failures
// =========================================================================

#[test]
fn test_unregistered_type_fails() {
    #[derive(Serialize)]
    struct Unknown;

    let err = serializer().serialize(&Unknown).unwrap_err();
    assert!(matches!(err, SerializerError::UnregisteredType(_)));
}

#[test]
fn test_every_truncation_fails_cleanly() {
    let s = serializer();
    let bytes = s.serialize(&sample_state()).unwrap();

    for cut in 0..bytes.len() {
        assert!(s.deserialize(&bytes[..cut]).is_err(), "prefix of {cut} bytes decoded");
    }
}

#[test]
fn test_deeply_nested_input_fails() {
    let s = serializer();
    let mut bytes = tree_prefix(&s);
    bytes.extend(std::iter::repeat_n(1u8, 1 << 20));

    let err = s.deserialize(&bytes).unwrap_err();
    assert!(matches!(err, SerializerError::DepthLimitExceeded(128)));
}

#[test]
fn test_max_depth_is_configurable() {
    let prefix = tree_prefix(&serializer());
    // Four nodes and a leaf.
    let mut bytes = prefix.clone();
    bytes.extend([1, 1, 1, 1, 0]);

    assert!(serializer().with_max_depth(5).deserialize(&bytes).is_ok());
    assert!(matches!(
        serializer().with_max_depth(4).deserialize(&bytes),
        Err(SerializerError::DepthLimitExceeded(4))
    ));

    bytes.truncate(prefix.len());
    bytes.extend(std::iter::repeat_n(1u8, 150));
    bytes.push(0);
    assert!(serializer().with_max_depth(256).deserialize(&bytes).is_ok());
}

#[test]
fn test_peers_with_different_tables_are_detected() {
    let ours = TypeTableBuilder::new().register::<Command>().build().unwrap();
    let theirs = TypeTableBuilder::new()
        .register::<Command>()
        .register::<EntityState>()
        .build()
        .unwrap();

    let err = ours
        .verify_fingerprint(theirs.fingerprint().as_bytes())
        .unwrap_err();
    assert!(matches!(err, SerializerError::TypeTableMismatch { .. }));
}

#[test]
fn test_direct_form_is_not_generic_form() {
    let s = serializer();
    let direct = s.serialize_direct(&Command::Drop).unwrap();
    let generic = s.serialize(&Command::Drop).unwrap();

    assert_ne!(direct, generic);
    assert_eq!(s.deserialize_direct::<Command>(&direct).unwrap(), Command::Drop);
}
