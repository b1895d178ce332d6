// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Read-only view over X.509 certificates.

```ASN.1
Certificate  ::=  SEQUENCE  {
     tbsCertificate       TBSCertificate,
     signatureAlgorithm   AlgorithmIdentifier,
     signatureValue       BIT STRING  }

TBSCertificate  ::=  SEQUENCE  {
     version         [0]  EXPLICIT Version DEFAULT v1,
     serialNumber         CertificateSerialNumber,
     signature            AlgorithmIdentifier,
     issuer               Name,
     validity             Validity,
     subject              Name,
     subjectPublicKeyInfo SubjectPublicKeyInfo,
     issuerUniqueID  [1]  IMPLICIT UniqueIdentifier OPTIONAL,
     subjectUniqueID [2]  IMPLICIT UniqueIdentifier OPTIONAL,
     extensions      [3]  EXPLICIT Extensions OPTIONAL }
```
*/

use {
    crate::{
        algorithm::{KeyAlgorithm, SignatureAlgorithm},
        asn1time,
        ber::{tag, BerOctet},
        error::{CardCryptoError, Result},
        rfc3280, rfc4519,
        rfc5280::{self, KeyUsage},
        rsa::RsaPublicKey,
        signing::RsaVerifier,
    },
    bytes::Bytes,
    chrono::{DateTime, Utc},
    log::debug,
    std::convert::TryFrom,
};

/// PEM tag of a certificate.
pub const PEM_CERTIFICATE: &str = "CERTIFICATE";

fn expect_sequence(octet: &BerOctet, field: &'static str) -> Result<()> {
    if octet.is_constructed() && octet.is_universal(tag::SEQUENCE) {
        Ok(())
    } else {
        debug!("certificate {} is {}", field, octet.describe());
        Err(CardCryptoError::CertificateFormat(field))
    }
}

/// Content of a BIT STRING without its unused bits octet, which must be 0.
fn bit_string_octets(octet: &BerOctet, field: &'static str) -> Result<Bytes> {
    if octet.is_constructed() || !octet.is_universal(tag::BIT_STRING) {
        return Err(CardCryptoError::CertificateFormat(field));
    }

    let data = octet.data_bytes()?;
    match data.first() {
        Some(0) => Ok(data.slice(1..)),
        _ => Err(CardCryptoError::CertificateFormat(field)),
    }
}

fn strip_leading_zeros(data: Bytes) -> Bytes {
    let start = data
        .iter()
        .position(|b| *b != 0)
        .unwrap_or_else(|| data.len().saturating_sub(1));

    data.slice(start..)
}

fn next_field<'a>(
    fields: &'a [BerOctet],
    pos: &mut usize,
    name: &'static str,
) -> Result<&'a BerOctet> {
    let field = fields
        .get(*pos)
        .ok_or(CardCryptoError::CertificateFormat(name))?;
    *pos += 1;

    Ok(field)
}

fn algorithm_oid(octet: &BerOctet, field: &'static str) -> Result<String> {
    expect_sequence(octet, field)?;

    octet
        .child(0)
        .ok_or(CardCryptoError::CertificateFormat(field))?
        .object_id()
}

/// An X.509 certificate decoded into its structural parts.
///
/// Fields are located by position within `tbsCertificate`, except for the
/// extensions which are found by scanning for context tag 3. Accessors
/// derive their output from the decoded elements on every call.
#[derive(Clone, Debug)]
pub struct X509Cert {
    data: Bytes,
    root: BerOctet,
    serial_number: BerOctet,
    issuer: BerOctet,
    validity: BerOctet,
    subject: BerOctet,
    subject_public_key_info: BerOctet,
    /// The `Extensions` SEQUENCE. Empty when the certificate has none.
    extensions: BerOctet,
    is_ca: bool,
    is_root: bool,
}

impl PartialEq for X509Cert {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for X509Cert {}

impl X509Cert {
    /// Construct an instance by decoding DER encoded data.
    ///
    /// A copy of the data is retained and available via
    /// [Self::constructed_data].
    pub fn from_der(data: impl AsRef<[u8]>) -> Result<Self> {
        Self::decode(Bytes::copy_from_slice(data.as_ref()))
    }

    /// Construct an instance from a PEM `CERTIFICATE` document.
    pub fn from_pem(data: impl AsRef<[u8]>) -> Result<Self> {
        let doc = pem::parse(data.as_ref())?;

        if doc.tag != PEM_CERTIFICATE {
            return Err(CardCryptoError::PemUnexpectedTag(doc.tag));
        }

        Self::decode(Bytes::from(doc.contents))
    }

    fn decode(data: Bytes) -> Result<Self> {
        let root = BerOctet::decode(data.clone())?;
        expect_sequence(&root, "Certificate")?;

        let (tbs, _, _) = match root.children()? {
            [tbs, algorithm, signature] => (tbs, algorithm, signature),
            other => {
                debug!("certificate has {} top-level elements", other.len());
                return Err(CardCryptoError::CertificateFormat("Certificate"));
            }
        };

        expect_sequence(tbs, "tbsCertificate")?;
        let fields = tbs.children()?;

        let mut pos = 0;
        if fields.first().map_or(false, |f| f.is_context(0)) {
            pos += 1;
        }

        let serial_number = next_field(fields, &mut pos, "serialNumber")?.clone();
        next_field(fields, &mut pos, "signature")?;
        let issuer = next_field(fields, &mut pos, "issuer")?.clone();
        let validity = next_field(fields, &mut pos, "validity")?.clone();
        let subject = next_field(fields, &mut pos, "subject")?.clone();
        let subject_public_key_info =
            next_field(fields, &mut pos, "subjectPublicKeyInfo")?.clone();

        if serial_number.is_constructed() || !serial_number.is_universal(tag::INTEGER) {
            return Err(CardCryptoError::CertificateFormat("serialNumber"));
        }
        expect_sequence(&issuer, "issuer")?;
        expect_sequence(&validity, "validity")?;
        if validity.children()?.len() != 2 {
            return Err(CardCryptoError::CertificateFormat("validity"));
        }
        expect_sequence(&subject, "subject")?;
        expect_sequence(&subject_public_key_info, "subjectPublicKeyInfo")?;

        let extensions = match fields[pos..].iter().find(|f| f.is_context(3)) {
            Some(wrapper) => {
                let extensions = wrapper
                    .child(0)
                    .ok_or(CardCryptoError::CertificateFormat("extensions"))?
                    .clone();
                expect_sequence(&extensions, "extensions")?;
                extensions
            }
            None => BerOctet::sequence(vec![]),
        };

        let basic_constraints =
            rfc5280::find_unique_extension(&extensions, rfc5280::OID_BASIC_CONSTRAINTS)?;
        let is_ca = match basic_constraints {
            Some(ext) => rfc5280::basic_constraints_ca(&rfc5280::extension_value(ext)?)?,
            None => false,
        };
        let is_root = issuer.octet() == subject.octet();

        let cert = Self {
            data,
            root,
            serial_number,
            issuer,
            validity,
            subject,
            subject_public_key_info,
            extensions,
            is_ca,
            is_root,
        };

        debug!(
            "decoded certificate serial {} subject {:?} (CA: {}, self-issued: {})",
            cert.serial_number_hex(),
            rfc3280::name_to_string(&cert.subject).unwrap_or_default(),
            cert.is_ca,
            cert.is_root,
        );

        Ok(cert)
    }

    /// The data this instance was decoded from.
    pub fn constructed_data(&self) -> &[u8] {
        &self.data
    }

    /// Encode the certificate to a PEM string.
    pub fn encode_pem(&self) -> String {
        pem::encode(&pem::Pem {
            tag: PEM_CERTIFICATE.to_string(),
            contents: self.data.to_vec(),
        })
    }

    /// The decoded certificate tree.
    pub fn octet(&self) -> &BerOctet {
        &self.root
    }

    /// The serial number INTEGER content, sign byte included.
    pub fn serial_number(&self) -> Bytes {
        self.serial_number.data_bytes().unwrap_or_default()
    }

    /// The serial number content as lowercase hex.
    pub fn serial_number_hex(&self) -> String {
        hex::encode(self.serial_number())
    }

    /// The encoded issuer Name.
    pub fn issuer(&self) -> Bytes {
        self.issuer.octet()
    }

    /// The encoded subject Name.
    pub fn subject(&self) -> Bytes {
        self.subject.octet()
    }

    pub fn issuer_name(&self) -> &BerOctet {
        &self.issuer
    }

    pub fn subject_name(&self) -> &BerOctet {
        &self.subject
    }

    /// The issuer rendered as `CN=Test, O=Example`.
    pub fn issuer_string(&self) -> Result<String> {
        rfc3280::name_to_string(&self.issuer)
    }

    /// The subject rendered as `CN=Test, O=Example`.
    pub fn subject_string(&self) -> Result<String> {
        rfc3280::name_to_string(&self.subject)
    }

    /// Raw content of every issuer attribute of type `oid`.
    pub fn issuer_attribute(&self, oid: &str) -> Result<Vec<Bytes>> {
        attribute_values(&self.issuer, oid)
    }

    /// Every issuer attribute of type `oid`, transcoded to UTF-8.
    pub fn issuer_attribute_utf8(&self, oid: &str) -> Result<Vec<String>> {
        attribute_strings(&self.issuer, oid)
    }

    /// Raw content of every subject attribute of type `oid`.
    pub fn subject_attribute(&self, oid: &str) -> Result<Vec<Bytes>> {
        attribute_values(&self.subject, oid)
    }

    /// Every subject attribute of type `oid`, transcoded to UTF-8.
    pub fn subject_attribute_utf8(&self, oid: &str) -> Result<Vec<String>> {
        attribute_strings(&self.subject, oid)
    }

    pub fn issuer_org(&self) -> Result<Vec<Bytes>> {
        self.issuer_attribute(rfc4519::OID_ORGANIZATION_NAME)
    }

    pub fn issuer_org_utf8(&self) -> Result<Vec<String>> {
        self.issuer_attribute_utf8(rfc4519::OID_ORGANIZATION_NAME)
    }

    pub fn issuer_common_name(&self) -> Result<Vec<Bytes>> {
        self.issuer_attribute(rfc4519::OID_COMMON_NAME)
    }

    pub fn issuer_common_name_utf8(&self) -> Result<Vec<String>> {
        self.issuer_attribute_utf8(rfc4519::OID_COMMON_NAME)
    }

    pub fn subject_org(&self) -> Result<Vec<Bytes>> {
        self.subject_attribute(rfc4519::OID_ORGANIZATION_NAME)
    }

    pub fn subject_org_utf8(&self) -> Result<Vec<String>> {
        self.subject_attribute_utf8(rfc4519::OID_ORGANIZATION_NAME)
    }

    pub fn subject_common_name(&self) -> Result<Vec<Bytes>> {
        self.subject_attribute(rfc4519::OID_COMMON_NAME)
    }

    pub fn subject_common_name_utf8(&self) -> Result<Vec<String>> {
        self.subject_attribute_utf8(rfc4519::OID_COMMON_NAME)
    }

    fn validity_time(&self, index: usize, field: &'static str) -> Result<String> {
        self.validity
            .child(index)
            .ok_or(CardCryptoError::CertificateFormat(field))?
            .decoded_time()
    }

    /// The notBefore time as `YYYYMMDDHHMMSS`.
    pub fn validity_not_before(&self) -> Result<String> {
        self.validity_time(0, "notBefore")
    }

    /// The notAfter time as `YYYYMMDDHHMMSS`.
    pub fn validity_not_after(&self) -> Result<String> {
        self.validity_time(1, "notAfter")
    }

    pub fn not_before(&self) -> Result<DateTime<Utc>> {
        asn1time::time_to_datetime(&self.validity_not_before()?)
    }

    pub fn not_after(&self) -> Result<DateTime<Utc>> {
        asn1time::time_to_datetime(&self.validity_not_after()?)
    }

    /// Whether `time` falls within the validity period, bounds included.
    pub fn time_constraints_valid(&self, time: &DateTime<Utc>) -> Result<bool> {
        Ok(self.not_before()? <= *time && *time <= self.not_after()?)
    }

    /// The algorithm of the subject public key.
    pub fn public_key_algorithm(&self) -> Result<KeyAlgorithm> {
        let algorithm = self
            .subject_public_key_info
            .child(0)
            .ok_or(CardCryptoError::CertificateFormat("subjectPublicKeyInfo"))?;

        KeyAlgorithm::try_from(algorithm_oid(algorithm, "subjectPublicKeyInfo algorithm")?.as_str())
    }

    /// The subjectPublicKey BIT STRING octets.
    pub fn public_key_data(&self) -> Result<Bytes> {
        let key = self
            .subject_public_key_info
            .child(1)
            .ok_or(CardCryptoError::CertificateFormat("subjectPublicKey"))?;

        bit_string_octets(key, "subjectPublicKey")
    }

    /// The RSAPublicKey INTEGER at `index`, sign padding included.
    fn rsa_component(&self, index: usize, field: &'static str) -> Result<Bytes> {
        let algorithm = self.public_key_algorithm()?;
        if !matches!(algorithm, KeyAlgorithm::Rsa) {
            return Err(CardCryptoError::UnsupportedKeyAlgorithm(algorithm.oid().to_string()));
        }

        let key = BerOctet::decode(self.public_key_data()?)?;
        expect_sequence(&key, "RSAPublicKey")?;

        match key.children()? {
            [_, _] => {}
            _ => return Err(CardCryptoError::CertificateFormat("RSAPublicKey")),
        }

        let integer = key
            .child(index)
            .filter(|i| !i.is_constructed() && i.is_universal(tag::INTEGER))
            .ok_or(CardCryptoError::CertificateFormat(field))?;

        integer.data_bytes()
    }

    /// The RSA modulus INTEGER content, leading zero bytes kept.
    pub fn modulus_raw(&self) -> Result<Bytes> {
        self.rsa_component(0, "modulus")
    }

    /// The RSA modulus without leading zero bytes.
    pub fn modulus(&self) -> Result<Bytes> {
        Ok(strip_leading_zeros(self.modulus_raw()?))
    }

    /// The RSA public exponent INTEGER content, leading zero bytes kept.
    pub fn public_exponent_raw(&self) -> Result<Bytes> {
        self.rsa_component(1, "publicExponent")
    }

    /// The RSA public exponent without leading zero bytes.
    pub fn public_exponent(&self) -> Result<Bytes> {
        Ok(strip_leading_zeros(self.public_exponent_raw()?))
    }

    /// The subject public key as a key usable with the RSA layer.
    pub fn rsa_public_key(&self) -> Result<RsaPublicKey> {
        RsaPublicKey::new(&self.modulus_raw()?, &self.public_exponent_raw()?)
    }

    /// The keyUsage bits, left-justified in a 32-bit word.
    ///
    /// The certificate must carry exactly one keyUsage extension.
    pub fn key_usage_bits(&self) -> Result<u32> {
        let found = rfc5280::find_extensions(&self.extensions, rfc5280::OID_KEY_USAGE)?;

        let extension = match found.as_slice() {
            [extension] => extension,
            _ => {
                return Err(CardCryptoError::ExtensionCardinality {
                    oid: rfc5280::OID_KEY_USAGE.to_string(),
                    count: found.len(),
                })
            }
        };

        let value = rfc5280::extension_value(extension)?;
        if value.is_constructed() || !value.is_universal(tag::BIT_STRING) {
            return Err(CardCryptoError::CertificateFormat("keyUsage"));
        }

        rfc5280::bit_string_word(value.data()?)
    }

    /// The keyUsage flags. See [Self::key_usage_bits].
    pub fn key_usage(&self) -> Result<KeyUsage> {
        Ok(KeyUsage::from_bits_truncate(self.key_usage_bits()?))
    }

    /// Dotted OIDs of the extended key usage purposes.
    ///
    /// Empty when the extension is absent.
    pub fn extended_key_usage(&self) -> Result<Vec<String>> {
        match rfc5280::find_unique_extension(&self.extensions, rfc5280::OID_EXTENDED_KEY_USAGE)? {
            Some(ext) => rfc5280::extended_key_usage_oids(&rfc5280::extension_value(ext)?),
            None => Ok(vec![]),
        }
    }

    /// The `Extensions` SEQUENCE, empty when the certificate has none.
    pub fn extensions(&self) -> &BerOctet {
        &self.extensions
    }

    /// Whether basicConstraints marks this certificate as a CA.
    pub fn is_ca_cert(&self) -> bool {
        self.is_ca
    }

    /// Whether the encoded issuer and subject are identical.
    ///
    /// The signature is not checked. See
    /// [Self::verify_signed_by_certificate] for that.
    pub fn is_root_cert(&self) -> bool {
        self.is_root
    }

    /// The encoded tbsCertificate, which is what the signature covers.
    pub fn tbs_certificate_data(&self) -> Bytes {
        self.root
            .child(0)
            .map(|tbs| tbs.octet())
            .unwrap_or_default()
    }

    /// The outer signatureAlgorithm.
    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm> {
        let algorithm = self
            .root
            .child(1)
            .ok_or(CardCryptoError::CertificateFormat("signatureAlgorithm"))?;

        SignatureAlgorithm::try_from(algorithm_oid(algorithm, "signatureAlgorithm")?.as_str())
    }

    /// The signatureValue octets.
    pub fn signature_value(&self) -> Result<Bytes> {
        let signature = self
            .root
            .child(2)
            .ok_or(CardCryptoError::CertificateFormat("signatureValue"))?;

        bit_string_octets(signature, "signatureValue")
    }

    /// Verify that `signer`'s key produced this certificate's signature.
    pub fn verify_signed_by_certificate(&self, signer: &X509Cert) -> Result<()> {
        let verifier = RsaVerifier::new(signer.rsa_public_key()?, self.signature_algorithm()?);

        verifier.verify_message(&self.tbs_certificate_data(), &self.signature_value()?)
    }
}

fn attribute_values(name: &BerOctet, oid: &str) -> Result<Vec<Bytes>> {
    rfc3280::name_attribute_values(name, oid)?
        .into_iter()
        .map(|value| value.data_bytes())
        .collect()
}

fn attribute_strings(name: &BerOctet, oid: &str) -> Result<Vec<String>> {
    rfc3280::name_attribute_values(name, oid)?
        .into_iter()
        .map(rfc3280::directory_string_to_utf8)
        .collect()
}
