// Path: crates/ipc/build.rs
fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);

    // Node-facing control surface.
    tonic_build::compile_protos("proto/prove.proto")?;

    // External proving backends.
    tonic_build::compile_protos("proto/backend.proto")?;

    Ok(())
}
