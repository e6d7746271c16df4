fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use a vendored protoc so the build does not depend on a system install
    std::env::set_var("PROTOC", protobuf_src::protoc());

    // Compile proto files for the gRPC search service
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(&["proto/searchgate.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/");
    println!("cargo:rerun-if-changed=build.rs");

    Ok(())
}
