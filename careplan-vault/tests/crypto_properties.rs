//! Property tests for the vault round trips.

use careplan_vault::{LocalVault, Vault};
use proptest::prelude::*;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
        .block_on(future)
}

proptest! {
    #[test]
    fn any_byte_payload_round_trips(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let vault = LocalVault::new();
        let id = vault.create_vault("prop");
        let recovered = block_on(async {
            let cipher = vault.encrypt_bytes(&data, &id).await.unwrap();
            vault.decrypt_bytes(&cipher).await.unwrap()
        });
        prop_assert_eq!(recovered, data);
    }

    #[test]
    fn any_text_payload_round_trips(text in ".{0,200}") {
        let vault = LocalVault::new();
        let id = vault.create_vault("prop");
        let recovered = block_on(async {
            let cipher = vault.encrypt_text(&text, &id).await.unwrap();
            vault.decrypt_text(&cipher).await.unwrap()
        });
        prop_assert_eq!(recovered, text);
    }
}
