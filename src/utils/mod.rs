pub mod counter;
pub mod encoding;
pub mod files;
pub mod struct_pack;
#[cfg(feature = "threadpool")]
pub mod threadpool;
