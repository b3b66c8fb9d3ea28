//! Envelope codec
//!
//! [`encapsulate`] turns plaintext into an envelope on an outbound SA,
//! [`decapsulate`] recovers plaintext from an envelope on an inbound SA.
//! The codec treats the plaintext as opaque bytes; the gateway layer decides
//! what goes inside (a full serialized inner packet, in tunnel mode).
//!
//! Decapsulation runs its steps in a fixed order: parse, replay pre-check,
//! authenticate-and-decrypt, replay commit. The pre-check rejects known
//! replays before paying for decryption, and the window only advances after
//! authentication, so spoofed sequence numbers cannot poison it.

use crate::tunnel::envelope::Envelope;
use crate::tunnel::sa::{Direction, SecurityAssociation};
use crate::tunnel::{Error, Result};

/// Encapsulate plaintext into an envelope
///
/// Issues the SA's next sequence number, seals the plaintext with the
/// header bound as associated data, and returns the finished envelope.
///
/// # Errors
///
/// * `Internal` - The SA is not outbound
/// * `SequenceExhausted` - The SA's 32-bit counter is spent
pub fn encapsulate(sa: &mut SecurityAssociation, plaintext: &[u8]) -> Result<Envelope> {
    if sa.direction() != Direction::Outbound {
        return Err(Error::Internal(format!(
            "Cannot encapsulate on {} SA 0x{:08x}",
            sa.direction(),
            sa.spi()
        )));
    }

    let sequence = sa.next_sequence()?;
    let nonce = sa.nonce(sequence);
    let aad = Envelope::aad(sa.spi(), sequence);

    let ciphertext = sa
        .cipher()
        .seal(sa.encryption_key(), &nonce, plaintext, &aad)?;

    Ok(Envelope::new(sa.spi(), sequence, ciphertext))
}

/// Decapsulate an envelope back to plaintext
///
/// # Errors
///
/// * `Internal` - The SA is not inbound, or the envelope's SPI does not
///   match the SA
/// * `ReplayDetected` - The sequence number was already accepted or fell
///   below the window
/// * `IntegrityCheckFailed` - The tag did not verify (tampered ciphertext,
///   forged header, or wrong keys)
pub fn decapsulate(sa: &mut SecurityAssociation, envelope: &Envelope) -> Result<Vec<u8>> {
    if sa.direction() != Direction::Inbound {
        return Err(Error::Internal(format!(
            "Cannot decapsulate on {} SA 0x{:08x}",
            sa.direction(),
            sa.spi()
        )));
    }
    if envelope.spi != sa.spi() {
        return Err(Error::Internal(format!(
            "Envelope SPI 0x{:08x} handed to SA 0x{:08x}",
            envelope.spi,
            sa.spi()
        )));
    }

    sa.replay_window().check(envelope.sequence_number)?;

    let nonce = sa.nonce(envelope.sequence_number);
    let aad = Envelope::aad(envelope.spi, envelope.sequence_number);

    let plaintext = sa
        .cipher()
        .open(sa.encryption_key(), &nonce, &envelope.ciphertext, &aad)
        .map_err(|err| match err {
            Error::IntegrityCheckFailed(_) => Error::IntegrityCheckFailed(sa.spi()),
            other => other,
        })?;

    // Authenticated: now the window may advance.
    sa.replay_window_mut().commit(envelope.sequence_number);

    Ok(plaintext)
}
