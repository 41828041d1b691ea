// Copyright 2014 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::env;
use std::process;

macro_rules! we {
    ($($tt:tt)*) => {{
        use std::io::Write;
        let _ = writeln!(&mut ::std::io::stderr(), $($tt)*);
    }}
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    // The portable engine needs nothing from the system. Only the native
    // engine links against libhs and libch (Chimera), whose link flags come
    // from pkg-config.
    if env::var("CARGO_FEATURE_NATIVE").is_err() {
        return;
    }
    probe();
}

#[cfg(feature = "native")]
fn probe() {
    for lib in &["libhs", "libch"] {
        if let Err(err) = pkg_config::Config::new().find(lib) {
            we!("{} cannot be found by pkg-config: {}", lib, err);
            process::exit(1);
        }
    }
    // Chimera confirms matches with PCRE, which it links statically but
    // doesn't always advertise in its .pc file.
    if pkg_config::Config::new().find("libpcre").is_err() {
        println!("cargo:rustc-link-lib=pcre");
    }
}

#[cfg(not(feature = "native"))]
fn probe() {
    we!("the native feature was requested without pkg-config");
    process::exit(1);
}
