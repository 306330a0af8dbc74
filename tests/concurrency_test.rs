//! Concurrent first use of the service.

use aws_s3_service::mocks::{MockConnector, TestFixtures};
use aws_s3_service::{ClientHandle, S3Error, S3Service};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 16;

fn race<F>(service: &Arc<S3Service>, f: F) -> Vec<Result<ClientHandle, S3Error>>
where
    F: Fn(&S3Service) -> Result<ClientHandle, S3Error> + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(THREADS));
    let f = Arc::new(f);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let service = Arc::clone(service);
            let barrier = Arc::clone(&barrier);
            let f = Arc::clone(&f);
            thread::spawn(move || {
                barrier.wait();
                f(&service)
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().expect("worker panicked"))
        .collect()
}

#[test]
fn concurrent_first_calls_construct_once() {
    let connector = Arc::new(MockConnector::with_delay(Duration::from_millis(50)));
    let service = Arc::new(
        S3Service::builder()
            .settings(TestFixtures::static_settings())
            .connector(connector.clone())
            .build(),
    );

    let clients: Vec<ClientHandle> = race(&service, |s| s.client())
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(connector.constructions(), 1);
    let first = &clients[0];
    assert!(clients.iter().all(|c| Arc::ptr_eq(first, c)));
}

#[test]
fn concurrent_callers_after_a_failure_still_construct_once() {
    let connector = Arc::new(MockConnector::failing(1));
    let service = Arc::new(
        S3Service::builder()
            .settings(TestFixtures::static_settings())
            .connector(connector.clone())
            .build(),
    );

    assert!(service.client().is_err());

    let clients: Vec<ClientHandle> = race(&service, |s| s.client())
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(connector.constructions(), 2);
    assert!(clients.iter().all(|c| Arc::ptr_eq(&clients[0], c)));
}

#[test]
fn close_after_concurrent_use_shuts_down_shared_client() {
    let connector = Arc::new(MockConnector::with_delay(Duration::from_millis(20)));
    let service = Arc::new(
        S3Service::builder()
            .settings(TestFixtures::static_settings())
            .connector(connector.clone())
            .build(),
    );

    let results = race(&service, |s| s.client());
    service.close();

    for client in results {
        assert!(client.unwrap().is_shutdown());
    }
    assert_eq!(connector.constructions(), 1);
    assert_eq!(connector.shutdowns(), 1);
    assert!(service.client().is_err());
}
