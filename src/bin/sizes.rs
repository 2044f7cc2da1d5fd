//! This file produces a binary that prints the sizes of the KP-ABE components
//! such as the MPK, MSK, USK, CT for a few representative policies.

use kpabe::{AccessTree, Attribute, AttributeSet, Compress, Config, KpAbeKem, Policy};

const UNIVERSE: [&str; 8] = [
    "admin", "finance", "eng", "hr", "legal", "ops", "sales", "audit",
];

fn policies() -> Vec<(&'static str, Policy)> {
    vec![
        ("single leaf", Policy::leaf("finance")),
        (
            "finance AND eng",
            Policy::and(vec![Policy::leaf("finance"), Policy::leaf("eng")]),
        ),
        (
            "2of4 + nested OR",
            Policy::threshold(
                2,
                vec![
                    Policy::leaf("admin"),
                    Policy::leaf("finance"),
                    Policy::or(vec![Policy::leaf("hr"), Policy::leaf("legal")]),
                    Policy::leaf("audit"),
                ],
            ),
        ),
    ]
}

macro_rules! print_sizes_kem {
    ($scheme_name: ident, $struct: ident) => {{
        use kpabe::kem::$scheme_name::$struct;

        let mut rng = rand::thread_rng();
        let universe: Vec<Attribute> = UNIVERSE.iter().map(|a| Attribute::from(*a)).collect();
        let (pk, sk) = $struct::setup(&Config::default(), &universe, &mut rng).unwrap();

        println!("{}", <$struct as KpAbeKem>::IDENTIFIER);
        println!("MPK:\t{}", pk.to_bytes().len());
        println!("MSK:\t{}", sk.to_bytes().len());

        for (name, policy) in policies() {
            let tree = AccessTree::new(&policy).unwrap();
            let usk = $struct::keygen(&sk, &tree, &mut rng).unwrap();
            println!("USK:\t{}\t({})", usk.to_bytes().len(), name);
        }

        for n in [1, 3, UNIVERSE.len()] {
            let attrs: AttributeSet = UNIVERSE[..n].iter().copied().collect();
            let (c, _k) = $struct::encaps(&pk, &attrs, &mut rng).unwrap();
            println!("CT:\t{}\t({} attributes)", c.to_bytes().len(), n);
        }
        println!();
    }};
}

fn main() {
    println!("KEM sizes in bytes:\n");
    print_sizes_kem!(gpsw, Gpsw);
    print_sizes_kem!(gpsw_lu, GpswLu);
}
