#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use loupe_reflect as reflect;
pub use loupe_utils as utils;
