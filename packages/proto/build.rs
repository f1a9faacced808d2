fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure().compile_protos(
        &["proto/club/v1/club.proto", "proto/market/v1/market.proto"],
        &["proto"],
    )?;
    Ok(())
}
