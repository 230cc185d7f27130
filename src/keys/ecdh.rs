// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! ECDH key agreement.
//!
//! Two shapes of the exchange are needed for key wrapping. The peer side
//! generates an ephemeral keypair on the target key's curve and hands out
//! the compressed ephemeral point together with the shared secret. The
//! local side later reconstructs the same secret from its private key and
//! that ephemeral point.

use openssl::bn::BigNumContext;
use openssl::derive::Deriver;
use openssl::ec::EcKey;
use openssl::ec::EcPoint;
use openssl::pkey::PKey;

use crate::CryptoError;
use crate::KeyKind;
use crate::PrivateKey;
use crate::PublicKey;
use crate::SecretBytes;

/// Derives the shared secret from a local private key and a peer supplied
/// ephemeral point. The point is decoded on the local key's curve and
/// validated before use. The secret is the raw X coordinate.
pub fn ecdh_derive_secret_local(
    key: &PrivateKey,
    peer_point: &[u8],
) -> Result<SecretBytes, CryptoError> {
    if key.kind() != KeyKind::Ec {
        return Err(CryptoError::UnsupportedOperation);
    }
    let ec = key.pkey().ec_key()?;
    let group = ec.group();
    let mut ctx = BigNumContext::new()?;
    let point = EcPoint::from_bytes(group, peer_point, &mut ctx)?;
    let peer_ec = EcKey::from_public_key(group, &point)?;
    peer_ec.check_key().map_err(|_| CryptoError::InvalidKey)?;
    let peer = PKey::from_ec_key(peer_ec)?;

    let mut deriver = Deriver::new(key.pkey())?;
    deriver.set_peer(&peer)?;
    Ok(SecretBytes::new(deriver.derive_to_vec()?))
}

/// Generates an ephemeral keypair on the curve of `peer` and derives the
/// shared secret against it. Returns the compressed ephemeral public point
/// and the secret.
pub fn ecdh_derive_secret_peer(
    peer: &PublicKey,
) -> Result<(Vec<u8>, SecretBytes), CryptoError> {
    if peer.kind() != KeyKind::Ec {
        return Err(CryptoError::UnsupportedOperation);
    }
    let curve = peer.curve().ok_or(CryptoError::UnsupportedOperation)?;
    let group = curve.group()?;
    let local_ec = EcKey::generate(&group)?;
    let local = PKey::from_ec_key(local_ec)?;

    let mut deriver = Deriver::new(&local)?;
    deriver.set_peer(peer.pkey())?;
    let secret = SecretBytes::new(deriver.derive_to_vec()?);

    let ec = local.ec_key()?;
    let mut ctx = BigNumContext::new()?;
    let ephemeral = ec.public_key().to_bytes(
        ec.group(),
        openssl::ec::PointConversionForm::COMPRESSED,
        &mut ctx,
    )?;
    Ok((ephemeral, secret))
}
