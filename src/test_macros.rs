use rand::{CryptoRng, RngCore};

/// An entropy source that is never available.
pub struct FailingRng;

impl RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        unimplemented!()
    }

    fn next_u64(&mut self) -> u64 {
        unimplemented!()
    }

    fn fill_bytes(&mut self, _: &mut [u8]) {
        unimplemented!()
    }

    fn try_fill_bytes(&mut self, _: &mut [u8]) -> Result<(), rand::Error> {
        Err(rand::Error::from(
            core::num::NonZeroU32::new(rand::Error::CUSTOM_START).unwrap(),
        ))
    }
}

impl CryptoRng for FailingRng {}

macro_rules! test_kem {
    ($name: ident) => {
        use crate::test_macros::FailingRng;
        use crate::{AccessTree, Attribute, AttributeSet, Compress, Config, Error, KpAbeKem, Policy};
        use alloc::vec;
        use alloc::vec::Vec;

        const UNIVERSE: [&'static str; 5] = ["admin", "finance", "eng", "hr", "legal"];

        fn universe() -> Vec<Attribute> {
            UNIVERSE.iter().map(|a| Attribute::from(*a)).collect()
        }

        fn finance_and_eng() -> AccessTree {
            AccessTree::new(&Policy::and(vec![
                Policy::leaf("finance"),
                Policy::leaf("eng"),
            ]))
            .unwrap()
        }

        #[allow(dead_code)]
        struct DefaultSubResults {
            pk: PublicKey,
            sk: SecretKey,
            usk: UserSecretKey,
            c: CipherText,
            k: crate::SharedSecret,
        }

        fn perform_default() -> DefaultSubResults {
            let mut rng = rand::thread_rng();
            let (pk, sk) = $name::setup(&Config::default(), &universe(), &mut rng).unwrap();
            let usk = $name::keygen(&sk, &finance_and_eng(), &mut rng).unwrap();
            let attrs = AttributeSet::from(["finance", "eng", "admin"]);
            let (c, k) = $name::encaps(&pk, &attrs, &mut rng).unwrap();

            DefaultSubResults { pk, sk, usk, c, k }
        }

        #[test]
        fn eq_encaps_decaps() {
            let results = perform_default();
            let k2 = $name::decaps(&results.usk, &results.c).unwrap();

            assert_eq!(results.k, k2);
        }

        #[test]
        fn unsatisfied_policy_is_rejected() {
            let mut rng = rand::thread_rng();
            let results = perform_default();
            let (c, _) = $name::encaps(&results.pk, &AttributeSet::from(["finance"]), &mut rng)
                .unwrap();

            assert_eq!($name::decaps(&results.usk, &c), Err(Error::PolicyNotSatisfied));
        }

        #[test]
        fn nested_policy() {
            let mut rng = rand::thread_rng();
            let (pk, sk) = $name::setup(&Config::default(), &universe(), &mut rng).unwrap();

            // (finance OR eng) AND (admin OR hr)
            let tree = AccessTree::new(&Policy::and(vec![
                Policy::or(vec![Policy::leaf("finance"), Policy::leaf("eng")]),
                Policy::or(vec![Policy::leaf("admin"), Policy::leaf("hr")]),
            ]))
            .unwrap();
            let usk = $name::keygen(&sk, &tree, &mut rng).unwrap();

            let (c, k) = $name::encaps(&pk, &AttributeSet::from(["eng", "hr"]), &mut rng).unwrap();
            assert_eq!($name::decaps(&usk, &c).unwrap(), k);

            let (c, _) = $name::encaps(&pk, &AttributeSet::from(["eng", "legal"]), &mut rng)
                .unwrap();
            assert_eq!($name::decaps(&usk, &c), Err(Error::PolicyNotSatisfied));
        }

        #[test]
        fn reconstruction_is_subset_invariant() {
            let mut rng = rand::thread_rng();
            let (pk, sk) = $name::setup(&Config::default(), &universe(), &mut rng).unwrap();

            // 2of3(admin, (finance AND eng), 2of3(hr, legal, admin))
            let tree = AccessTree::new(&Policy::threshold(
                2,
                vec![
                    Policy::leaf("admin"),
                    Policy::and(vec![Policy::leaf("finance"), Policy::leaf("eng")]),
                    Policy::threshold(
                        2,
                        vec![Policy::leaf("hr"), Policy::leaf("legal"), Policy::leaf("admin")],
                    ),
                ],
            ))
            .unwrap();
            let usk = $name::keygen(&sk, &tree, &mut rng).unwrap();

            let attrs = AttributeSet::from(UNIVERSE);
            let (c, k) = $name::encaps(&pk, &attrs, &mut rng).unwrap();

            let lowest = tree.witness(&attrs).unwrap();
            let highest = tree
                .witness_by(&attrs, |ok, k| ok[ok.len() - k..].to_vec())
                .unwrap();
            let spread = tree
                .witness_by(&attrs, |ok, k| {
                    let mut picked = vec![ok[0]];
                    picked.extend_from_slice(&ok[ok.len() - (k - 1)..]);
                    picked
                })
                .unwrap();
            assert_ne!(lowest, highest);

            for witness in [lowest, highest, spread] {
                assert_eq!($name::decaps_with(&usk, &c, &witness).unwrap(), k);
            }
        }

        #[test]
        fn keygen_is_fresh() {
            let mut rng = rand::thread_rng();
            let results = perform_default();
            let usk2 = $name::keygen(&results.sk, &finance_and_eng(), &mut rng).unwrap();

            assert_ne!(results.usk, usk2);
            assert_eq!($name::decaps(&usk2, &results.c).unwrap(), results.k);
        }

        #[test]
        fn encaps_is_fresh() {
            let mut rng = rand::thread_rng();
            let results = perform_default();
            let (c2, k2) =
                $name::encaps(&results.pk, $name::attributes(&results.c), &mut rng).unwrap();

            assert_ne!(results.c, c2);
            assert_ne!(results.k, k2);
        }

        #[test]
        fn key_from_other_system_yields_other_secret() {
            let mut rng = rand::thread_rng();
            let results = perform_default();
            let (_, sk2) = $name::setup(&Config::default(), &universe(), &mut rng).unwrap();
            let usk2 = $name::keygen(&sk2, &finance_and_eng(), &mut rng).unwrap();

            assert_ne!($name::decaps(&usk2, &results.c).unwrap(), results.k);
        }

        #[test]
        fn empty_attribute_set_is_rejected() {
            let mut rng = rand::thread_rng();
            let results = perform_default();

            assert_eq!(
                $name::encaps(&results.pk, &AttributeSet::new(), &mut rng).map(|_| ()),
                Err(Error::EmptyAttributeSet)
            );
        }

        #[test]
        fn unsupported_security_level() {
            let mut rng = rand::thread_rng();
            let config = Config {
                security_bits: 192,
                ..Config::default()
            };

            assert!(matches!(
                $name::setup(&config, &universe(), &mut rng),
                Err(Error::GroupInit)
            ));
        }

        #[test]
        fn randomness_failure_is_reported() {
            let results = perform_default();

            assert!(matches!(
                $name::setup(&Config::default(), &universe(), &mut FailingRng),
                Err(Error::Randomness)
            ));
            assert!(matches!(
                $name::keygen(&results.sk, &finance_and_eng(), &mut FailingRng),
                Err(Error::Randomness)
            ));
            assert!(matches!(
                $name::encaps(&results.pk, $name::attributes(&results.c), &mut FailingRng),
                Err(Error::Randomness)
            ));
        }

        #[test]
        fn eq_serialize_deserialize() {
            let result = perform_default();

            assert_eq!(result.pk, PublicKey::from_bytes(&result.pk.to_bytes()).unwrap());
            assert_eq!(
                result.sk.to_bytes(),
                SecretKey::from_bytes(&result.sk.to_bytes()).unwrap().to_bytes()
            );
            assert_eq!(
                result.usk,
                UserSecretKey::from_bytes(&result.usk.to_bytes()).unwrap()
            );
            assert_eq!(
                result.c,
                CipherText::from_bytes(&result.c.to_bytes()).unwrap()
            );

            let c = CipherText::from_bytes(&result.c.to_bytes()).unwrap();
            let usk = UserSecretKey::from_bytes(&result.usk.to_bytes()).unwrap();
            assert_eq!($name::decaps(&usk, &c).unwrap(), result.k);
        }

        #[test]
        fn deep_key_round_trips_with_its_config() {
            let mut rng = rand::thread_rng();
            let (pk, sk) = $name::setup(&Config::default(), &universe(), &mut rng).unwrap();

            let mut policy = Policy::leaf("finance");
            for _ in 0..40 {
                policy = Policy::or(vec![policy]);
            }
            let config = Config {
                max_policy_depth: 41,
                ..Config::default()
            };
            let tree = AccessTree::with_config(&policy, &config).unwrap();
            let usk = $name::keygen(&sk, &tree, &mut rng).unwrap();
            let (c, k) = $name::encaps(&pk, &AttributeSet::from(["finance"]), &mut rng).unwrap();
            assert_eq!($name::decaps(&usk, &c).unwrap(), k);

            let bytes = usk.to_bytes();
            assert_eq!(UserSecretKey::from_bytes(&bytes), Err(Error::PolicyTooDeep));

            let usk2 = UserSecretKey::from_bytes_with_config(&bytes, &config).unwrap();
            assert_eq!(usk2, usk);
            assert_eq!($name::decaps(&usk2, &c).unwrap(), k);
        }

        #[test]
        fn truncated_encodings_are_malformed() {
            let result = perform_default();
            let bytes = result.c.to_bytes();

            assert_eq!(
                CipherText::from_bytes(&bytes[..bytes.len() - 1]),
                Err(Error::Malformed)
            );

            let mut long = bytes.clone();
            long.push(0);
            assert_eq!(CipherText::from_bytes(&long), Err(Error::Malformed));
        }
    };
}
