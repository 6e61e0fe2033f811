fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Protobuf code is only generated for the gRPC adapter
    #[cfg(feature = "grpc")]
    {
        tonic_build::configure()
            .build_server(true)
            .build_client(true)
            .compile(&["proto/configmodel.proto"], &["proto"])?;
    }

    println!("cargo:rerun-if-changed=proto/configmodel.proto");

    Ok(())
}
