use std::net::SocketAddr;
use std::sync::Arc;

use proptest::prelude::*;

use crate::filter::FilterConfig;
use crate::protocol::{ProbePacket, Scheme};
use crate::server::{ClientKey, ClientRegistry, Dispatcher, Telemetry};

type Probe = (u8, u64, u64);

fn run(order: &[(SocketAddr, Probe)]) -> Vec<(ClientKey, crate::filter::FilterBank, Vec<i64>)> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    rt.block_on(async {
        let d = Dispatcher::new(
            Arc::new(ClientRegistry::new(4)),
            FilterConfig::default(),
            Telemetry::new(8),
        );
        let mut outputs: Vec<(SocketAddr, Vec<i64>)> = Vec::new();
        for (seq, (origin, (id, sent, recv))) in order.iter().enumerate() {
            let scheme = Scheme::from_id(*id).unwrap();
            let bytes = ProbePacket::new(scheme, u32::try_from(seq).unwrap(), *sent).encode();
            let resp = d.handle(&bytes, *origin, *recv).await.unwrap();
            match outputs.iter_mut().find(|(a, _)| a == origin) {
                Some((_, v)) => v.push(resp.correction_us),
                None => outputs.push((*origin, vec![resp.correction_us])),
            }
        }
        outputs.sort_by_key(|(a, _)| *a);

        let snapshot = d.registry().snapshot().await;
        snapshot
            .into_iter()
            .zip(outputs)
            .map(|(s, (_, v))| (s.key, s.filters, v))
            .collect()
    })
}

fn probes() -> impl Strategy<Value = Vec<Probe>> {
    prop::collection::vec((0u8..4, 0u64..10_000_000, 0u64..10_000_000), 1..24).prop_map(|v| {
        // Receive times increase so PID sees forward time.
        let mut t = 0;
        v.into_iter()
            .map(|(id, sent, gap)| {
                t += gap % 500_000;
                (id, sent, t)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn clients_evolve_independently_of_interleaving(a in probes(), b in probes()) {
        let client_a = SocketAddr::from(([10, 0, 0, 1], 1000));
        let client_b = SocketAddr::from(([10, 0, 0, 2], 1000));

        let batched: Vec<_> = a.iter().map(|p| (client_a, *p))
            .chain(b.iter().map(|p| (client_b, *p)))
            .collect();

        let mut interleaved = Vec::new();
        for i in 0..a.len().max(b.len()) {
            if let Some(p) = a.get(i) {
                interleaved.push((client_a, *p));
            }
            if let Some(p) = b.get(i) {
                interleaved.push((client_b, *p));
            }
        }

        prop_assert_eq!(run(&batched), run(&interleaved));
    }
}
