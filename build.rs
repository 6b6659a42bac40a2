fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Source a protoc binary from the vendored crate if one isn't already
    // on PATH, so the build doesn't depend on a system install.
    if std::env::var_os("PROTOC").is_none() {
        if let Ok(path) = protoc_bin_vendored::protoc_bin_path() {
            unsafe {
                std::env::set_var("PROTOC", path);
            }
        }
    }
    let proto = "proto/tableside.proto";
    println!("cargo:rerun-if-changed={proto}");
    tonic_build::compile_protos(proto)?;
    Ok(())
}
