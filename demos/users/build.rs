fn main() {
    println!("cargo:rerun-if-changed=schema/user.yaml");
    repogen_codegen::generate_from_descriptor(
        "schema/user.yaml",
        std::env::var("OUT_DIR").unwrap(),
    )
    .expect("Code generation failed");
}
