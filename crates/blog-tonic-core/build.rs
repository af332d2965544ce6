/// Builds the gRPC client and server code for the `blog.proto` definition
/// using `tonic-prost-build`.
///
/// The generated modules land in `OUT_DIR` together with an encoded file
/// descriptor set (`blog_descriptor.bin`) that the server hands to
/// `tonic-reflection`.
///
/// # Files and Paths
///
/// - Proto file: `proto/blog.proto`
/// - Includes: `proto/`
///
/// # Panics
///
/// Panics if code generation fails.
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("blog_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/blog.proto"], &["proto"])
        .unwrap();
}
