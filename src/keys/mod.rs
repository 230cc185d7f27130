// Copyright (C) Microsoft Corporation. All rights reserved.

//! Key objects, curve registry, keypair generation and key identifiers.
//!
//! Keys are opaque handles over the toolkit's EVP key type, tagged with
//! their kind (RSA or EC) and, for EC, the named curve. Private to public
//! derivation is always defined; the reverse never is.

mod ecdh;
mod rsa;

use openssl::bn::BigNumContext;
use openssl::bn::BigNumRef;
use openssl::ec::EcGroup;
use openssl::ec::EcKey;
use openssl::ec::EcPoint;
use openssl::ec::PointConversionForm;
use openssl::hash::hash;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::Id;
use openssl::pkey::PKey;
use openssl::pkey::PKeyRef;
use openssl::pkey::Private;
use openssl::pkey::Public;

pub use ecdh::*;
pub use rsa::*;

use crate::CryptoError;

/// Kind of an asymmetric key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Rsa,
    Ec,
}

/// Named EC curves usable for mail keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    /// NIST P-256 (prime256v1 / secp256r1)
    P256,
    /// NIST P-384 (secp384r1)
    P384,
    /// NIST P-521 (secp521r1)
    P521,
    /// secp256k1
    Secp256k1,
}

impl EcCurve {
    const ALL: [EcCurve; 4] = [
        EcCurve::P256,
        EcCurve::P384,
        EcCurve::P521,
        EcCurve::Secp256k1,
    ];

    /// The toolkit NID of the curve.
    pub fn nid(self) -> Nid {
        match self {
            EcCurve::P256 => Nid::X9_62_PRIME256V1,
            EcCurve::P384 => Nid::SECP384R1,
            EcCurve::P521 => Nid::SECP521R1,
            EcCurve::Secp256k1 => Nid::SECP256K1,
        }
    }

    /// Canonical short name, as the toolkit prints it.
    pub fn short_name(self) -> &'static str {
        match self {
            EcCurve::P256 => "prime256v1",
            EcCurve::P384 => "secp384r1",
            EcCurve::P521 => "secp521r1",
            EcCurve::Secp256k1 => "secp256k1",
        }
    }

    /// Dotted ASN.1 object identifier, as written into v2 key records.
    pub fn oid_text(self) -> &'static str {
        match self {
            EcCurve::P256 => "1.2.840.10045.3.1.7",
            EcCurve::P384 => "1.3.132.0.34",
            EcCurve::P521 => "1.3.132.0.35",
            EcCurve::Secp256k1 => "1.3.132.0.10",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            EcCurve::P256 => &["prime256v1", "secp256r1", "P-256"],
            EcCurve::P384 => &["secp384r1", "P-384"],
            EcCurve::P521 => &["secp521r1", "P-521"],
            EcCurve::Secp256k1 => &["secp256k1"],
        }
    }

    /// Looks up a curve by any of its accepted names.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| {
            c.aliases()
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(name))
        })
    }

    pub(crate) fn from_nid(nid: Nid) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.nid() == nid)
    }

    /// Looks up a curve by name or dotted OID, as found in v2 records.
    pub(crate) fn from_algo_text(text: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.oid_text() == text)
            .or_else(|| Self::from_name(text))
    }

    pub(crate) fn group(self) -> Result<EcGroup, CryptoError> {
        Ok(EcGroup::from_curve_name(self.nid())?)
    }
}

/// An asymmetric public key handle.
#[derive(Debug)]
pub struct PublicKey {
    pkey: PKey<Public>,
    kind: KeyKind,
    curve: Option<EcCurve>,
}

/// An asymmetric private key handle.
#[derive(Debug)]
pub struct PrivateKey {
    pkey: PKey<Private>,
    kind: KeyKind,
    curve: Option<EcCurve>,
}

/// An owned (public, private) pair. Dropping the pair drops both halves.
#[derive(Debug)]
pub struct Keypair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

impl PublicKey {
    pub(crate) fn from_pkey(pkey: PKey<Public>) -> Result<Self, CryptoError> {
        let (kind, curve) = classify(&pkey)?;
        Ok(Self { pkey, kind, curve })
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// The named curve, for EC keys.
    pub fn curve(&self) -> Option<EcCurve> {
        self.curve
    }

    pub(crate) fn pkey(&self) -> &PKeyRef<Public> {
        &self.pkey
    }

    /// The public EC point in compressed form.
    pub(crate) fn ec_point_compressed(&self) -> Result<Vec<u8>, CryptoError> {
        if self.kind != KeyKind::Ec {
            return Err(CryptoError::UnsupportedOperation);
        }
        let ec = self.pkey.ec_key()?;
        let mut ctx = BigNumContext::new()?;
        Ok(ec
            .public_key()
            .to_bytes(ec.group(), PointConversionForm::COMPRESSED, &mut ctx)?)
    }
}

impl PrivateKey {
    pub(crate) fn from_pkey(pkey: PKey<Private>) -> Result<Self, CryptoError> {
        let (kind, curve) = classify(&pkey)?;
        Ok(Self { pkey, kind, curve })
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// The named curve, for EC keys.
    pub fn curve(&self) -> Option<EcCurve> {
        self.curve
    }

    pub(crate) fn pkey(&self) -> &PKeyRef<Private> {
        &self.pkey
    }

    /// Derives the public half of this key.
    pub fn to_public(&self) -> Result<PublicKey, CryptoError> {
        let pkey = match self.kind {
            KeyKind::Rsa => {
                let rsa = self.pkey.rsa()?;
                let pub_rsa =
                    openssl::rsa::Rsa::from_public_components(rsa.n().to_owned()?, rsa.e().to_owned()?)?;
                PKey::from_rsa(pub_rsa)?
            }
            KeyKind::Ec => {
                let ec = self.pkey.ec_key()?;
                let pub_ec = EcKey::from_public_key(ec.group(), ec.public_key())?;
                PKey::from_ec_key(pub_ec)?
            }
        };
        Ok(PublicKey {
            pkey,
            kind: self.kind,
            curve: self.curve,
        })
    }
}

fn classify<T: openssl::pkey::HasPublic>(
    pkey: &PKey<T>,
) -> Result<(KeyKind, Option<EcCurve>), CryptoError> {
    match pkey.id() {
        Id::RSA => Ok((KeyKind::Rsa, None)),
        Id::EC => {
            let ec = pkey.ec_key()?;
            let nid = ec
                .group()
                .curve_name()
                .ok_or(CryptoError::UnsupportedOperation)?;
            let curve = EcCurve::from_nid(nid).ok_or_else(|| {
                CryptoError::UnknownCurve(nid.short_name().unwrap_or("?").to_string())
            })?;
            Ok((KeyKind::Ec, Some(curve)))
        }
        _ => Err(CryptoError::UnsupportedOperation),
    }
}

/// Generates a fresh keypair.
///
/// For RSA, `bits` selects the modulus size and `curve` is ignored. For EC,
/// `curve` names the curve ([`CryptoError::UnknownCurve`] if it is not
/// recognized) and `bits` is ignored.
pub fn generate_keypair(
    kind: KeyKind,
    bits: u32,
    curve: Option<&str>,
) -> Result<Keypair, CryptoError> {
    let pkey = match kind {
        KeyKind::Rsa => {
            let rsa = openssl::rsa::Rsa::generate(bits)?;
            PKey::from_rsa(rsa)?
        }
        KeyKind::Ec => {
            let name = curve.unwrap_or("");
            let curve = EcCurve::from_name(name)
                .ok_or_else(|| CryptoError::UnknownCurve(name.to_string()))?;
            let group = curve.group()?;
            let ec = EcKey::generate(&group)?;
            PKey::from_ec_key(ec)?
        }
    };
    let private = PrivateKey::from_pkey(pkey)?;
    let public = private.to_public()?;
    Ok(Keypair { public, private })
}

/// Rebuilds an EC private key from its scalar, computing the public point
/// by scalar multiplication and validating the result.
pub(crate) fn ec_private_from_scalar(
    curve: EcCurve,
    scalar: &BigNumRef,
) -> Result<PrivateKey, CryptoError> {
    let group = curve.group()?;
    let ctx = BigNumContext::new()?;
    let mut point = EcPoint::new(&group)?;
    point.mul_generator(&group, scalar, &ctx)?;
    let ec = EcKey::from_private_components(&group, scalar, &point)?;
    ec.check_key().map_err(|_| CryptoError::InvalidKey)?;
    let pkey = PKey::from_ec_key(ec)?;
    PrivateKey::from_pkey(pkey)
}

/// Computes the key identifier: a digest over the DER SubjectPublicKeyInfo
/// of the key, with EC points in compressed form.
pub fn public_key_id(key: &PublicKey, algorithm: &str) -> Result<Vec<u8>, CryptoError> {
    let md = MessageDigest::from_name(algorithm)
        .ok_or_else(|| CryptoError::InvalidCipher(algorithm.to_string()))?;
    let der = crate::der::spki_der(key)?;
    Ok(hash(md, &der)?.to_vec())
}

/// Computes the legacy v1 key identifier: SHA-256 over the ASCII hex of the
/// compressed public point, uppercase as the toolkit prints points. EC only.
pub fn public_key_id_legacy(key: &PublicKey) -> Result<Vec<u8>, CryptoError> {
    let point = key.ec_point_compressed()?;
    let point_hex = hex::encode_upper(point);
    Ok(hash(MessageDigest::sha256(), point_hex.as_bytes())?.to_vec())
}
