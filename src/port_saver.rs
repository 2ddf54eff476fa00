use rocket::fairing::Info;
use rocket::{Orbit, Rocket};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Reports the port rocket actually bound to. Binding port 0 and reading
/// the real port back is how the test harness runs many instances side by
/// side.
pub fn create_pair() -> (PortSaver, Port) {
    let (tx, rx) = oneshot::channel();
    let port_saver = PortSaver {
        sender: Mutex::new(Some(tx)),
    };
    let port = Port {
        rx: Mutex::new(Some(rx)),
        port: tokio::sync::OnceCell::new(),
    };
    (port_saver, port)
}

pub struct Port {
    rx: Mutex<Option<oneshot::Receiver<u16>>>,
    port: tokio::sync::OnceCell<u16>,
}

impl Port {
    pub async fn get(&self) -> u16 {
        *self
            .port
            .get_or_init(|| {
                let rx = self
                    .rx
                    .lock()
                    .unwrap()
                    .take()
                    .expect("The bound port was already consumed.");
                async move {
                    rx.await
                        .expect("The server was torn down before reporting its port.")
                }
            })
            .await
    }
}

pub struct PortSaver {
    sender: Mutex<Option<oneshot::Sender<u16>>>,
}

#[rocket::async_trait]
impl rocket::fairing::Fairing for PortSaver {
    fn info(&self) -> Info {
        Info {
            name: "Port Saver",
            kind: rocket::fairing::Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        if let Some(sender) = self.sender.lock().unwrap().take() {
            let _ = sender.send(rocket.config().port);
        }
    }
}
