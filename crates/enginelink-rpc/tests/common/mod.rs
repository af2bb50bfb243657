//! A scripted fake engine on the far end of an in-memory connection.

#![allow(dead_code)]

use std::sync::Arc;

use enginelink_protocol::{Codec, JsonCodec, Request, Response};
use enginelink_rpc::{RpcClient, RpcConfig};
use enginelink_transport::{Connection, MemoryConnection};
use tokio::task::JoinHandle;

/// The engine's end of the connection.
pub struct FakeEngine {
    pub conn: Arc<MemoryConnection>,
}

impl FakeEngine {
    /// Reads and decodes the next request. Panics on end-of-stream.
    pub async fn read_request(&self) -> Request {
        let frame = self
            .conn
            .recv()
            .await
            .expect("engine recv failed")
            .expect("client closed the connection");
        JsonCodec.decode(&frame).expect("client sent a bad request")
    }

    pub async fn reply(&self, response: &Response) {
        let frame = JsonCodec.encode(response).unwrap();
        self.conn.send(&frame).await.unwrap();
    }

    pub async fn send_raw(&self, frame: &[u8]) {
        self.conn.send(frame).await.unwrap();
    }

    /// Answers every request with `answer` until the client goes away.
    pub fn serve<F>(self, mut answer: F) -> JoinHandle<()>
    where
        F: FnMut(Request) -> Response + Send + 'static,
    {
        tokio::spawn(async move {
            while let Ok(Some(frame)) = self.conn.recv().await {
                let request: Request = JsonCodec.decode(&frame).unwrap();
                let frame = JsonCodec.encode(&answer(request)).unwrap();
                if self.conn.send(&frame).await.is_err() {
                    break;
                }
            }
        })
    }
}

/// Returns the client's end and the engine's end of a fresh connection.
pub fn connect() -> (Arc<dyn Connection>, FakeEngine) {
    let (client, engine) = MemoryConnection::pair();
    (
        Arc::new(client),
        FakeEngine {
            conn: Arc::new(engine),
        },
    )
}

/// A client with the default config over a fresh connection.
pub fn client() -> (RpcClient, FakeEngine) {
    let (conn, engine) = connect();
    (RpcClient::new(conn, JsonCodec, RpcConfig::default()), engine)
}
