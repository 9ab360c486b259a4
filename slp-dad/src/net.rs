//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! UDP multicast and TCP socket plumbing (§6 "Ports/transport").
//!
//! Mirrors the teacher's channel-fed read/write loop split: a receive
//! loop decodes inbound datagrams/streams and calls the dispatcher
//! directly (the dispatcher is synchronous and non-blocking by
//! contract, §5), while outbound multicast adverts are handed to a
//! writer task over an unbounded channel so [`AdvertSink::broadcast`]
//! can stay synchronous.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{Instrument, debug_span, warn};

use slp_da_core::dispatcher;
use slp_da_core::handlers::DaBindings;
use slp_da_core::lifecycle::AdvertSink;
use slp_da_core::message::{DaAdvert, LocalBinding, MessageEvent, Performer, Remote, SrvAck, SrvRply};

use crate::wire;

/// RFC 2608 assigns 224.0.1.22 as the SLPv2 multicast group address.
pub const MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 1, 22);

/// Feeds multicast DAAdverts from [`DirectoryAgent`](slp_da_core::lifecycle::DirectoryAgent)
/// to a background task that owns the send half of the UDP socket.
pub struct MulticastAdvertSink {
    tx: UnboundedSender<DaAdvert>,
}

impl MulticastAdvertSink {
    pub fn new(socket: Arc<UdpSocket>, port: u16) -> MulticastAdvertSink {
        let (tx, mut rx) = mpsc::unbounded_channel::<DaAdvert>();
        let dst = SocketAddr::from((MULTICAST_GROUP, port));
        tokio::spawn(
            async move {
                while let Some(advert) = rx.recv().await {
                    let bytes = wire::encode_da_advert(&advert, true);
                    if let Err(error) = socket.send_to(&bytes, dst).await {
                        warn!(%error, "failed to send multicast DAAdvert");
                    }
                }
            }
            .instrument(debug_span!("multicast_advert_writer")),
        );
        MulticastAdvertSink { tx }
    }
}

impl AdvertSink for MulticastAdvertSink {
    fn broadcast(&self, advert: DaAdvert) {
        let _ = self.tx.send(advert);
    }
}

/// Binds a UDP socket joined to the SLP multicast group on `address`,
/// listening on `port` (§6).
pub fn bind_multicast(address: Ipv4Addr, port: u16) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)).into())?;
    socket.join_multicast_v4(&MULTICAST_GROUP, &address)?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}

#[derive(Default)]
struct UdpReplyPerformer {
    unicast_advert: Option<DaAdvert>,
}

impl Performer for UdpReplyPerformer {
    fn send_srv_rply(&mut self, _rply: SrvRply) {
        warn!("unexpected SrvRply from a multicast handler");
    }

    fn send_srv_ack(&mut self, _ack: SrvAck) {
        warn!("unexpected SrvAck from a multicast handler");
    }

    fn send_da_advert_unicast(&mut self, advert: DaAdvert, _to: &Remote) {
        self.unicast_advert = Some(advert);
    }
}

/// Receives datagrams on the multicast socket and dispatches them
/// (§4.4). Every datagram arriving here is treated as multicast
/// traffic, since this socket is joined only to the SLP group.
pub async fn udp_read_loop(
    socket: Arc<UdpSocket>,
    cache: Arc<slp_da_core::cache::ServiceInfoCache>,
    bindings: Arc<DaBindings>,
    local_address: String,
) {
    let mut buf = [0u8; 16384];
    loop {
        let (num_bytes, peer) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(error) => {
                warn!(%error, "UDP receive error");
                continue;
            }
        };

        let pdu = match wire::decode(&buf[..num_bytes]) {
            Ok(pdu) => pdu,
            Err(error) => {
                warn!(%error, "failed to decode inbound UDP PDU");
                continue;
            }
        };

        let event = MessageEvent {
            is_multicast: true,
            local: LocalBinding { address: local_address.clone() },
            remote: Remote { host: peer.ip().to_string() },
            body: pdu.body,
        };

        let mut performer = UdpReplyPerformer::default();
        dispatcher::dispatch(&bindings, &cache, event, &mut performer);
        if let Some(advert) = performer.unicast_advert {
            let bytes = wire::encode_da_advert(&advert, false);
            if let Err(error) = socket.send_to(&bytes, peer).await {
                warn!(%error, "failed to send unicast DAAdvert");
            }
        }
    }
}

#[derive(Default)]
struct TcpPerformer {
    outgoing: Option<BytesMut>,
}

impl Performer for TcpPerformer {
    fn send_srv_rply(&mut self, rply: SrvRply) {
        self.outgoing = Some(wire::encode_srv_rply(&rply));
    }

    fn send_srv_ack(&mut self, ack: SrvAck) {
        self.outgoing = Some(wire::encode_srv_ack(&ack));
    }

    fn send_da_advert_unicast(&mut self, _advert: DaAdvert, _to: &Remote) {
        warn!("unexpected unicast DAAdvert from a TCP handler");
    }
}

/// Accepts TCP connections on `listener` and services one request per
/// connection (§5 "handlers must not retain the connection after
/// return").
pub async fn tcp_accept_loop(
    listener: TcpListener,
    cache: Arc<slp_da_core::cache::ServiceInfoCache>,
    bindings: Arc<DaBindings>,
    local_address: String,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(v) => v,
            Err(error) => {
                warn!(%error, "TCP accept error");
                continue;
            }
        };

        let cache = cache.clone();
        let bindings = bindings.clone();
        let local_address = local_address.clone();
        tokio::spawn(
            async move {
                if let Err(error) =
                    service_tcp_connection(stream, peer, &cache, &bindings, &local_address).await
                {
                    warn!(%error, "TCP connection error");
                }
            }
            .instrument(debug_span!("tcp_connection", %peer)),
        );
    }
}

async fn service_tcp_connection(
    mut stream: tokio::net::TcpStream,
    peer: SocketAddr,
    cache: &slp_da_core::cache::ServiceInfoCache,
    bindings: &DaBindings,
    local_address: &str,
) -> io::Result<()> {
    let buf = read_pdu(&mut stream).await?;
    let pdu = match wire::decode(&buf) {
        Ok(pdu) => pdu,
        Err(error) => {
            warn!(%error, "failed to decode inbound TCP PDU");
            return Ok(());
        }
    };

    let event = MessageEvent {
        is_multicast: false,
        local: LocalBinding { address: local_address.to_string() },
        remote: Remote { host: peer.ip().to_string() },
        body: pdu.body,
    };

    let mut performer = TcpPerformer::default();
    dispatcher::dispatch(bindings, cache, event, &mut performer);

    if let Some(bytes) = performer.outgoing {
        stream.write_all(&bytes).await?;
        stream.flush().await?;
    }
    Ok(())
}

/// Reads one length-prefixed SLPv2 PDU (the 24-bit length field starts
/// at byte offset 2, RFC 2608 §8.1).
async fn read_pdu(stream: &mut tokio::net::TcpStream) -> io::Result<Vec<u8>> {
    let mut header = [0u8; 5];
    stream.read_exact(&mut header).await?;
    let mut len_buf = BytesMut::from(&header[2..5]);
    let length = ((len_buf.get_u8() as u32) << 16)
        | ((len_buf.get_u8() as u32) << 8)
        | len_buf.get_u8() as u32;

    let mut pdu = header.to_vec();
    pdu.resize(length as usize, 0);
    stream.read_exact(&mut pdu[5..]).await?;
    Ok(pdu)
}
