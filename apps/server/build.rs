use dotenvy::dotenv_iter;

fn main() {
    println!("cargo:rerun-if-changed=.env");

    let Ok(entries) = dotenv_iter() else {
        return;
    };

    for (k, v) in entries.flatten() {
        if k.starts_with("PINGKEEPER_") {
            println!("cargo:rustc-env={k}={v}");
        }
    }
}
