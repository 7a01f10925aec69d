pub mod path;
pub mod resolver;

pub use path::{
    decode_uri, encode_for_uri, file_name_of, file_uri, normalize_spec, points_to_same_map,
    relative_path_by_string_manipulation, split_parent,
};
pub use resolver::{locate, MapProbe, Resolution, ResolveRequest, ResolveTier, SearchLimits, StoreProbe};
