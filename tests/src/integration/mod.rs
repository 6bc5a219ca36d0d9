//! End-to-end scenarios over the memory transport.

#[cfg(test)]
mod calls;
#[cfg(test)]
mod identity;
#[cfg(test)]
mod reconnect;
#[cfg(test)]
mod status;
#[cfg(test)]
mod web_bridge;
